//! Target expressions and the tokenizer that splits them up.

use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::str::FromStr;

/// A compound target expression as supplied by a caller.
///
/// Expressions arrive either as one string, which is split on whitespace, or as a sequence of
/// words that has already been split. Either way the evaluator only borrows the expression, so a
/// caller's sequence is never modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetExpression {
    Text(String),
    Words(Vec<String>),
}

impl TargetExpression {
    /// Splits the expression into a fresh queue of raw [Token]s.
    ///
    /// Strings are split on runs of whitespace; there is no quoting. No validation happens here.
    pub fn tokenize(&self) -> VecDeque<Token> {
        match self {
            TargetExpression::Text(text) => text.split_whitespace().map(Token::from).collect(),
            TargetExpression::Words(words) => {
                words.iter().map(|w| Token::from(w.as_str())).collect()
            }
        }
    }

    /// Returns the expression as a single line of text, for diagnostics.
    pub fn text(&self) -> String {
        match self {
            TargetExpression::Text(text) => text.clone(),
            TargetExpression::Words(words) => words.join(" "),
        }
    }
}

impl Display for TargetExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for TargetExpression {
    fn from(text: &str) -> Self {
        TargetExpression::Text(text.to_string())
    }
}

impl From<String> for TargetExpression {
    fn from(text: String) -> Self {
        TargetExpression::Text(text)
    }
}

impl From<&String> for TargetExpression {
    fn from(text: &String) -> Self {
        TargetExpression::Text(text.clone())
    }
}

impl From<Vec<String>> for TargetExpression {
    fn from(words: Vec<String>) -> Self {
        TargetExpression::Words(words)
    }
}

impl From<&[&str]> for TargetExpression {
    fn from(words: &[&str]) -> Self {
        TargetExpression::Words(words.iter().map(|w| w.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TargetExpression {
    fn from(words: [&str; N]) -> Self {
        TargetExpression::from(&words[..])
    }
}

impl From<&TargetExpression> for TargetExpression {
    fn from(expression: &TargetExpression) -> Self {
        expression.clone()
    }
}

/// One of the five operator literals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl Operator {
    /// The operator's literal spelling in a target expression.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::LParen => "(",
            Operator::RParen => ")",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ();

    /// Operators are matched exactly; `AND` and `Not` are clauses, not operators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "and" => Operator::And,
            "or" => Operator::Or,
            "not" => Operator::Not,
            "(" => Operator::LParen,
            ")" => Operator::RParen,
            _ => return Err(()),
        })
    }
}

/// An atom of a target expression: an operator, or a clause that will be matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Operator(Operator),
    Clause(String),
}

impl Token {
    /// The token's text as it appeared in the expression.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Operator(op) => op.as_str(),
            Token::Clause(clause) => clause,
        }
    }
}

impl From<&str> for Token {
    fn from(word: &str) -> Self {
        match word.parse() {
            Ok(op) => Token::Operator(op),
            Err(()) => Token::Clause(word.to_string()),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
