//! Named, reusable target expressions (`N@name`).
//!
//! A nodegroup is expanded textually: its definition is turned into tokens and spliced into the
//! expression in place of the `N@` clause, wrapped in parentheses. Definitions may themselves
//! reference other nodegroups.

use super::clause::ClauseDescriptor;
use super::error::MatchError;
use super::expression::{Operator, Token};
use crate::engine::EngineId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How deeply nodegroup definitions may reference one another.
pub const MAX_NODEGROUP_DEPTH: usize = 32;

/// How many tokens nodegroup expansion may splice into a single evaluation.
pub const MAX_EXPANDED_TOKENS: usize = 4096;

/// The body of a nodegroup.
///
/// ```yaml
/// nodegroups:
///   web: G@role:web and not L@web13
///   db:
///     - db01
///     - db02
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NodegroupDefinition {
    /// A compound expression, split on whitespace.
    Expression(String),
    /// A pre-split expression.
    Words(Vec<String>),
}

impl NodegroupDefinition {
    pub fn words(&self) -> Vec<&str> {
        match self {
            NodegroupDefinition::Expression(text) => text.split_whitespace().collect(),
            NodegroupDefinition::Words(words) => words.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for NodegroupDefinition {
    fn from(text: &str) -> Self {
        NodegroupDefinition::Expression(text.to_string())
    }
}

impl From<String> for NodegroupDefinition {
    fn from(text: String) -> Self {
        NodegroupDefinition::Expression(text)
    }
}

impl From<Vec<String>> for NodegroupDefinition {
    fn from(words: Vec<String>) -> Self {
        NodegroupDefinition::Words(words)
    }
}

impl<const N: usize> From<[&str; N]> for NodegroupDefinition {
    fn from(words: [&str; N]) -> Self {
        NodegroupDefinition::Words(words.iter().map(|w| w.to_string()).collect())
    }
}

/// Nodegroup definitions by name, in the order they were defined.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct NodegroupTable {
    groups: IndexMap<String, NodegroupDefinition>,
}

impl NodegroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or redefines) a nodegroup.
    pub fn insert(&mut self, name: impl Into<String>, definition: impl Into<NodegroupDefinition>) {
        let _ = self.groups.insert(name.into(), definition.into());
    }

    /// Builder-style version of [Self::insert].
    pub fn with(
        mut self,
        name: impl Into<String>,
        definition: impl Into<NodegroupDefinition>,
    ) -> Self {
        self.insert(name, definition);
        self
    }

    pub fn get(&self, name: &str) -> Option<&NodegroupDefinition> {
        self.groups.get(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodegroupDefinition)> {
        self.groups.iter().map(|(name, def)| (name.as_str(), def))
    }
}

impl<K, V> FromIterator<(K, V)> for NodegroupTable
where
    K: Into<String>,
    V: Into<NodegroupDefinition>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = NodegroupTable::new();
        for (name, definition) in iter {
            table.insert(name, definition);
        }
        table
    }
}

/// Expands nodegroup references for one evaluation.
///
/// The token budget ([MAX_EXPANDED_TOKENS]) is shared by every expansion the expander performs,
/// so an expression can't get around it by referencing many nodegroups.
#[derive(Debug)]
pub struct Expander<'a> {
    table: &'a NodegroupTable,
    expression: &'a str,
    spliced: usize,
}

impl<'a> Expander<'a> {
    /// `expression` is only used for diagnostics.
    pub fn new(table: &'a NodegroupTable, expression: &'a str) -> Self {
        Expander {
            table,
            expression,
            spliced: 0,
        }
    }

    /// Expands the nodegroup `name`, including any nodegroups it references, into the tokens
    /// that replace its `N@` clause.
    ///
    /// # Errors
    ///
    /// Fails if `name` or a nodegroup it references isn't defined, if a definition is empty, if
    /// a definition references itself (directly or indirectly), or if expansion exceeds
    /// [MAX_NODEGROUP_DEPTH] or [MAX_EXPANDED_TOKENS].
    pub fn expand(&mut self, name: &str) -> Result<Vec<Token>, MatchError> {
        let mut stack = Vec::new();
        let mut out = Vec::new();
        self.expand_into(name, &mut stack, &mut out)?;
        self.spliced += out.len();
        debug!("nodegroup {name} expanded to {}", render(&out));
        Ok(out)
    }

    fn expand_into(
        &self,
        name: &str,
        stack: &mut Vec<String>,
        out: &mut Vec<Token>,
    ) -> Result<(), MatchError> {
        if stack.iter().any(|seen| seen == name) {
            return Err(self.overflow(
                name,
                format!("nodegroup references itself via {} -> {name}", stack.join(" -> ")),
            ));
        }
        if stack.len() >= MAX_NODEGROUP_DEPTH {
            return Err(self.overflow(
                name,
                format!("nodegroups nest more than {MAX_NODEGROUP_DEPTH} levels deep"),
            ));
        }

        let definition = self
            .table
            .get(name)
            .ok_or_else(|| MatchError::UnknownNodegroup {
                expression: self.expression.to_string(),
                nodegroup: name.to_string(),
            })?;
        let words = definition.words();
        if words.is_empty() {
            return Err(MatchError::malformed(
                self.expression,
                format!("nodegroup {name} has an empty definition"),
                Some(&format!("N@{name}")),
            ));
        }

        stack.push(name.to_string());
        self.push(name, out, Token::Operator(Operator::LParen))?;
        match list_shorthand(&words) {
            Some(clause) => {
                debug!("nodegroup {name} is a list of names; treating it as {clause}");
                self.push(name, out, Token::Clause(clause))?;
            }
            None => {
                for word in words {
                    let descriptor = ClauseDescriptor::parse(word);
                    if descriptor.engine == Some(EngineId::Nodegroup) {
                        self.expand_into(&descriptor.pattern, stack, out)?;
                    } else {
                        self.push(name, out, Token::from(word))?;
                    }
                }
            }
        }
        self.push(name, out, Token::Operator(Operator::RParen))?;
        stack.pop();
        Ok(())
    }

    fn push(&self, name: &str, out: &mut Vec<Token>, token: Token) -> Result<(), MatchError> {
        if self.spliced + out.len() + 1 > MAX_EXPANDED_TOKENS {
            return Err(self.overflow(
                name,
                format!("expansion exceeds {MAX_EXPANDED_TOKENS} tokens"),
            ));
        }
        out.push(token);
        Ok(())
    }

    fn overflow(&self, name: &str, reason: String) -> MatchError {
        MatchError::NodegroupExpansionOverflow {
            expression: self.expression.to_string(),
            nodegroup: name.to_string(),
            reason,
        }
    }
}

/// Rewrites a definition that is just a list of agent names as a single list clause.
///
/// A definition qualifies when it has no operators, no engine-prefixed clauses, and no `*`
/// wildcards. Names containing regex metacharacters turn the list into an `E@` alternation.
fn list_shorthand(words: &[&str]) -> Option<String> {
    let plain = words.iter().all(|word| {
        word.parse::<Operator>().is_err() && !word.contains('*') && !has_engine_prefix(word)
    });
    if !plain {
        return None;
    }

    const REGEX_CHARS: &[char] = &['(', '[', '{', '\\', '?', '}', ']', ')'];
    if words.iter().any(|word| word.contains(REGEX_CHARS)) {
        Some(format!("E@{}", words.join("|")))
    } else {
        Some(format!("L@{}", words.join(",")))
    }
}

/// Any `X@` prefix counts, even for letters that aren't engines.
fn has_engine_prefix(word: &str) -> bool {
    let mut chars = word.chars();
    let first_is_upper = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    (first_is_upper && chars.next() == Some('@')) || ClauseDescriptor::parse(word).engine.is_some()
}

fn render(tokens: &[Token]) -> String {
    let words: Vec<&str> = tokens.iter().map(Token::as_str).collect();
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(table: &NodegroupTable, name: &str) -> Result<String, MatchError> {
        Expander::new(table, "N@test").expand(name).map(|t| render(&t))
    }

    #[test]
    fn wraps_expansion_in_parentheses() {
        let table = NodegroupTable::new().with("web", "G@role:web or web*");
        assert_eq!("( G@role:web or web* )", expand(&table, "web").unwrap());
    }

    #[test]
    fn expands_nested_references_in_place() {
        let table = NodegroupTable::new()
            .with("web", "G@role:web")
            .with("prod", "N@web and not G@env:dev");
        assert_eq!(
            "( ( G@role:web ) and not G@env:dev )",
            expand(&table, "prod").unwrap(),
        );
    }

    #[test]
    fn accepts_definitions_as_words() {
        let table = NodegroupTable::new().with("web", ["G@role:web", "or", "E@web\\d+"]);
        assert_eq!("( G@role:web or E@web\\d+ )", expand(&table, "web").unwrap());
    }

    #[test]
    fn a_nodegroup_may_be_referenced_twice_without_a_cycle() {
        let table = NodegroupTable::new()
            .with("a", "G@x:y")
            .with("b", "N@a or N@a");
        assert_eq!("( ( G@x:y ) or ( G@x:y ) )", expand(&table, "b").unwrap());
    }

    mod list_shorthand {
        use super::*;

        #[test]
        fn plain_names_become_a_list_clause() {
            let table = NodegroupTable::new().with("db", "db01 db02");
            assert_eq!("( L@db01,db02 )", expand(&table, "db").unwrap());

            let table = NodegroupTable::new().with("db", ["db01"]);
            assert_eq!("( L@db01 )", expand(&table, "db").unwrap());
        }

        #[test]
        fn names_with_regex_characters_become_a_pcre_clause() {
            let table = NodegroupTable::new().with("db", "db0[12] backup");
            assert_eq!("( E@db0[12]|backup )", expand(&table, "db").unwrap());
        }

        #[test]
        fn wildcards_operators_and_prefixes_disable_it() {
            for definition in ["web* db01", "db01 or db02", "G@role:db db01", "X@y db01"] {
                let table = NodegroupTable::new().with("g", definition);
                let expanded = expand(&table, "g").unwrap();
                assert!(!expanded.contains("L@"), "{definition} => {expanded}");
            }
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn unknown_nodegroup() {
            let table = NodegroupTable::new().with("a", "N@missing");
            let err = expand(&table, "a").unwrap_err();
            let MatchError::UnknownNodegroup { nodegroup, .. } = err else {
                panic!("expected an unknown nodegroup, got {err}");
            };
            assert_eq!("missing", nodegroup);
        }

        #[test]
        fn self_reference() {
            let table = NodegroupTable::new().with("a", "G@x:y or N@a");
            let err = expand(&table, "a").unwrap_err();
            assert!(matches!(err, MatchError::NodegroupExpansionOverflow { .. }), "{err}");
        }

        #[test]
        fn indirect_cycle() {
            let table = NodegroupTable::new()
                .with("a", "N@b")
                .with("b", "N@c")
                .with("c", "web* and N@a");
            let err = expand(&table, "a").unwrap_err();
            assert!(matches!(err, MatchError::NodegroupExpansionOverflow { .. }), "{err}");
            assert!(err.to_string().contains("a -> b -> c -> a"), "{err}");
        }

        #[test]
        fn depth_limit() {
            let mut table = NodegroupTable::new();
            for i in 0..MAX_NODEGROUP_DEPTH + 5 {
                table.insert(format!("g{i}"), format!("N@g{}", i + 1));
            }
            table.insert(format!("g{}", MAX_NODEGROUP_DEPTH + 5), "web*");
            let err = expand(&table, "g0").unwrap_err();
            assert!(err.to_string().contains("levels deep"), "{err}");
        }

        #[test]
        fn token_limit() {
            // Each level doubles the expansion, so this would be billions of tokens unchecked.
            let mut table = NodegroupTable::new();
            for i in 0..30 {
                table.insert(format!("g{i}"), format!("N@g{0} or N@g{0}", i + 1));
            }
            table.insert("g30", "web*");
            let err = expand(&table, "g0").unwrap_err();
            assert!(err.to_string().contains("tokens"), "{err}");
        }

        #[test]
        fn token_limit_is_shared_across_expansions() {
            let words: Vec<String> = (0..MAX_EXPANDED_TOKENS / 2)
                .map(|i| if i % 2 == 0 { "web*" } else { "or" }.to_string())
                .collect();
            let table = NodegroupTable::new().with("big", words);
            let mut expander = Expander::new(&table, "N@big or N@big or N@big");
            expander.expand("big").unwrap();
            assert!(expander.expand("big").is_err());
        }

        #[test]
        fn token_limit_is_inclusive() {
            // The parentheses around the definition count toward the limit.
            let definition = |len: usize| -> Vec<String> {
                (0..len)
                    .map(|i| if i % 2 == 0 { "web*" } else { "or" }.to_string())
                    .collect()
            };
            let table = NodegroupTable::new()
                .with("full", definition(MAX_EXPANDED_TOKENS - 2))
                .with("over", definition(MAX_EXPANDED_TOKENS - 1));

            let mut expander = Expander::new(&table, "N@full");
            assert_eq!(MAX_EXPANDED_TOKENS, expander.expand("full").unwrap().len());

            let mut expander = Expander::new(&table, "N@over");
            let err = expander.expand("over").unwrap_err();
            assert!(matches!(err, MatchError::NodegroupExpansionOverflow { .. }), "{err}");
        }

        #[test]
        fn empty_definition() {
            let table = NodegroupTable::new().with("a", "  ");
            let err = expand(&table, "a").unwrap_err();
            assert!(matches!(err, MatchError::MalformedExpression { .. }), "{err}");
        }
    }

    #[test]
    fn deserializes_from_yaml() {
        let table: NodegroupTable = serde_yaml::from_str(
            "web: G@role:web and not L@web13\ndb:\n  - db01\n  - db02\n",
        )
        .unwrap();
        assert_eq!(2, table.len());
        assert_eq!(
            Some(&NodegroupDefinition::from("G@role:web and not L@web13")),
            table.get("web"),
        );
        assert_eq!(
            vec!["db01", "db02"],
            table.get("db").unwrap().words(),
        );
        assert_eq!(vec!["web", "db"], table.iter().map(|(n, _)| n).collect::<Vec<_>>());
    }
}
