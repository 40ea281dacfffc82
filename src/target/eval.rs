//! Evaluates a classified expression.
//!
//! The grammar, loosest binding first:
//!
//! ```text
//! or   := and ("or" and)*
//! and  := not ("and" not)*
//! not  := "not" not | atom
//! atom := value | "(" or ")"
//! ```

use super::classify::{compose, Item};
use super::error::MatchError;
use super::expression::Operator;

/// How deeply `not` and parentheses may nest.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Reduces classified items to a single verdict.
///
/// `expression` is only used for diagnostics.
///
/// # Errors
///
/// Fails if the items don't form exactly one well-formed boolean expression.
pub fn evaluate(items: &[Item], expression: &str) -> Result<bool, MatchError> {
    let mut parser = Parser {
        items,
        pos: 0,
        depth: 0,
        expression,
    };
    if items.is_empty() {
        return Err(parser.error("expression is empty", None));
    }

    let verdict = parser.or()?;
    match parser.peek() {
        None => Ok(verdict),
        Some(Item::Operator(Operator::RParen)) => {
            Err(parser.error("unmatched ')'", Some(Operator::RParen.as_str())))
        }
        Some(item) => Err(parser.error(
            "missing operator between clauses",
            Some(&item.to_string()),
        )),
    }
}

struct Parser<'a> {
    items: &'a [Item],
    pos: usize,
    depth: usize,
    expression: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Item> {
        self.items.get(self.pos).copied()
    }

    fn eat(&mut self, op: Operator) -> bool {
        if self.peek() == Some(Item::Operator(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<bool, MatchError> {
        let mut verdict = self.and()?;
        while self.eat(Operator::Or) {
            let rhs = self.and()?;
            verdict = verdict || rhs;
        }
        Ok(verdict)
    }

    fn and(&mut self) -> Result<bool, MatchError> {
        let mut verdict = self.not()?;
        while self.eat(Operator::And) {
            let rhs = self.not()?;
            verdict = verdict && rhs;
        }
        Ok(verdict)
    }

    fn not(&mut self) -> Result<bool, MatchError> {
        if self.eat(Operator::Not) {
            self.descend()?;
            let verdict = !self.not()?;
            self.depth -= 1;
            return Ok(verdict);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<bool, MatchError> {
        let Some(item) = self.peek() else {
            return Err(self.error("expression ends with an operator", None));
        };
        self.pos += 1;

        match item {
            Item::Value(verdict) => Ok(verdict),
            Item::Operator(Operator::LParen) => {
                self.descend()?;
                let verdict = self.or()?;
                self.depth -= 1;
                if self.eat(Operator::RParen) {
                    return Ok(verdict);
                }
                let found = self.peek().map(|item| item.to_string());
                Err(self.error("unclosed '('", found.as_deref()))
            }
            Item::Operator(op) => Err(self.error(
                format!("expected a clause or '(' but found '{op}'"),
                Some(op.as_str()),
            )),
        }
    }

    fn descend(&mut self) -> Result<(), MatchError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error(
                format!("expression nests more than {MAX_NESTING_DEPTH} levels deep"),
                None,
            ));
        }
        Ok(())
    }

    fn error(&self, reason: impl Into<String>, token: Option<&str>) -> MatchError {
        MatchError::MalformedExpression {
            expression: self.expression.to_string(),
            reason: reason.into(),
            token: token.map(str::to_string),
            composed: Some(compose(self.items)),
        }
    }
}
