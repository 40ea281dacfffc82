//! Parsing individual clauses such as `G@os:Ubuntu` or `web*`.

use crate::engine::EngineId;
use regex::Regex;
use std::sync::OnceLock;

const TARGET_PATTERN: &str = r"(?xs)
    ^(?:
        (?P<data>[GPIJ])(?P<delimiter>.)?@  # grain and pillar engines may set a delimiter
      | (?P<engine>[LNSER])@
    )?
    (?P<pattern>.+)$";

/// A clause split into its engine, optional delimiter, and pattern.
///
/// Clause syntax is `ENGINE@pattern` or, for grain and pillar engines, `ENGINE<delim>@pattern`,
/// where `<delim>` is a single character that replaces `:` as the key-path delimiter. Anything
/// else, including an unknown engine letter, is a glob pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClauseDescriptor {
    /// The requested engine; [None] means an implicit glob.
    pub engine: Option<EngineId>,

    /// The pattern handed to the engine.
    pub pattern: String,

    /// A custom key-path delimiter. Only ever set for engines that accept one.
    pub delimiter: Option<char>,
}

impl ClauseDescriptor {
    /// Parses a clause. Never fails: text that isn't engine-prefixed becomes a glob.
    pub fn parse(clause: &str) -> Self {
        static TARGET_REX: OnceLock<Regex> = OnceLock::new();
        let rex = TARGET_REX.get_or_init(|| {
            Regex::new(TARGET_PATTERN).expect("BUG: the clause regex should always compile")
        });

        let Some(caps) = rex.captures(clause) else {
            // Only the empty string fails to match.
            return ClauseDescriptor::glob(clause);
        };

        let letter = caps
            .name("data")
            .or_else(|| caps.name("engine"))
            .and_then(|m| m.as_str().chars().next());
        let engine = letter.and_then(EngineId::from_prefix);

        ClauseDescriptor {
            engine,
            pattern: caps["pattern"].to_string(),
            delimiter: caps
                .name("delimiter")
                .and_then(|m| m.as_str().chars().next()),
        }
    }

    /// A clause with no engine prefix.
    pub fn glob(pattern: &str) -> Self {
        ClauseDescriptor {
            engine: None,
            pattern: pattern.to_string(),
            delimiter: None,
        }
    }

    /// The engine that will handle this clause, with [EngineId::Glob] standing in for an
    /// unprefixed clause.
    pub fn effective_engine(&self) -> EngineId {
        self.engine.unwrap_or(EngineId::Glob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(
        engine: Option<EngineId>,
        pattern: &str,
        delimiter: Option<char>,
    ) -> ClauseDescriptor {
        ClauseDescriptor {
            engine,
            pattern: pattern.to_string(),
            delimiter,
        }
    }

    #[test]
    fn unprefixed_clauses_are_globs() {
        assert_eq!(parsed(None, "web*", None), ClauseDescriptor::parse("web*"));
        assert_eq!(EngineId::Glob, ClauseDescriptor::parse("web*").effective_engine());
    }

    #[test]
    fn recognizes_every_engine_letter() {
        use EngineId::*;
        for (clause, engine) in [
            ("G@os:Ubuntu", Grain),
            ("P@os:(Ubuntu|Debian)", GrainPcre),
            ("I@role:web", Pillar),
            ("J@role:w.*", PillarPcre),
            ("L@a,b", List),
            ("N@web", Nodegroup),
            ("S@10.0.0.0/8", IpCidr),
            ("E@web\\d+", Pcre),
            ("R@%cluster", Range),
        ] {
            let descriptor = ClauseDescriptor::parse(clause);
            assert_eq!(Some(engine), descriptor.engine, "{clause}");
            assert_eq!(&clause[2..], descriptor.pattern, "{clause}");
            assert_eq!(None, descriptor.delimiter, "{clause}");
        }
    }

    #[test]
    fn data_engines_accept_a_delimiter() {
        assert_eq!(
            parsed(Some(EngineId::Grain), "os|Ubuntu", Some('|')),
            ClauseDescriptor::parse("G|@os|Ubuntu"),
        );
        assert_eq!(
            parsed(Some(EngineId::PillarPcre), "a;b", Some(';')),
            ClauseDescriptor::parse("J;@a;b"),
        );
    }

    #[test]
    fn other_engines_do_not_accept_a_delimiter() {
        // `L|@a` isn't an engine prefix at all, so it's a glob.
        assert_eq!(parsed(None, "L|@a", None), ClauseDescriptor::parse("L|@a"));
    }

    #[test]
    fn unknown_engine_letters_are_globs() {
        assert_eq!(parsed(None, "X@foo", None), ClauseDescriptor::parse("X@foo"));
        assert_eq!(parsed(None, "g@os:x", None), ClauseDescriptor::parse("g@os:x"));
    }

    #[test]
    fn prefix_without_pattern_is_a_glob() {
        assert_eq!(parsed(None, "G@", None), ClauseDescriptor::parse("G@"));
        assert_eq!(parsed(None, "L@", None), ClauseDescriptor::parse("L@"));
    }

    #[test]
    fn pattern_may_contain_at_signs() {
        assert_eq!(
            parsed(Some(EngineId::List), "a@b,c@d", None),
            ClauseDescriptor::parse("L@a@b,c@d"),
        );
        assert_eq!(parsed(None, "user@host", None), ClauseDescriptor::parse("user@host"));
    }

    #[test]
    fn at_sign_may_itself_be_the_delimiter() {
        assert_eq!(
            parsed(Some(EngineId::Grain), "os@Ubuntu", Some('@')),
            ClauseDescriptor::parse("G@@os@Ubuntu"),
        );
    }

    #[test]
    fn empty_clause_is_an_empty_glob() {
        assert_eq!(parsed(None, "", None), ClauseDescriptor::parse(""));
    }
}
