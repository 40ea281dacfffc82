//! Turns a token stream into operators and clause results.
//!
//! This is the heart of compound matching. Tokens are taken from the front of a work queue, one
//! at a time:
//!
//! - Operators are checked against the previous item and appended. A `not` that directly follows
//!   a value or a `)` gets an implicit `and` in front of it, so `web* not db*` reads as
//!   `web* and not db*`.
//! - `N@` clauses are expanded and pushed back onto the front of the queue, so the nodegroup's
//!   tokens are processed next, exactly as though they had been written in its place.
//! - Every other clause is handed to its engine, and the engine's verdict is appended.
//!
//! The output still has to be checked for well-formedness; see [super::eval].

use super::clause::ClauseDescriptor;
use super::error::MatchError;
use super::expression::{Operator, TargetExpression, Token};
use super::nodegroup::{Expander, NodegroupTable};
use crate::context::MatchContext;
use crate::engine::{EngineId, EngineRegistry};
use anyhow::anyhow;
use std::any::Any;
use std::fmt::{self, Display};
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// One element of a classified expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Item {
    Operator(Operator),
    /// The verdict of one clause.
    Value(bool),
}

impl Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Operator(op) => op.fmt(f),
            Item::Value(true) => f.write_str("True"),
            Item::Value(false) => f.write_str("False"),
        }
    }
}

/// Renders classified items the way they'd read as a boolean expression, e.g.
/// `True and ( False or not True )`.
pub fn compose(items: &[Item]) -> String {
    let words: Vec<String> = items.iter().map(Item::to_string).collect();
    words.join(" ")
}

/// Classifies every token of `expression`, dispatching clauses to `engines`.
///
/// # Errors
///
/// Fails on the first operator that can't follow what came before it, the first clause whose
/// engine isn't registered or fails, and the first nodegroup that can't be expanded. Nothing
/// after the failing token is evaluated.
pub fn classify(
    expression: &TargetExpression,
    ctx: &MatchContext,
    engines: &EngineRegistry,
    nodegroups: &NodegroupTable,
) -> Result<Vec<Item>, MatchError> {
    let text = expression.text();
    let mut queue = expression.tokenize();
    let mut expander = Expander::new(nodegroups, &text);
    let mut items = Vec::with_capacity(queue.len());

    while let Some(token) = queue.pop_front() {
        match token {
            Token::Operator(op) => push_operator(&mut items, op, &text)?,
            Token::Clause(clause) => {
                let descriptor = ClauseDescriptor::parse(&clause);
                match descriptor.effective_engine() {
                    EngineId::Nodegroup => {
                        let tokens = expander.expand(&descriptor.pattern)?;
                        for token in tokens.into_iter().rev() {
                            queue.push_front(token);
                        }
                    }
                    engine => {
                        let verdict = dispatch(engines, engine, &descriptor, &clause, ctx, &text)?;
                        debug!("{engine} clause {clause} for {} => {verdict}", ctx.id);
                        items.push(Item::Value(verdict));
                    }
                }
            }
        }
    }

    Ok(items)
}

fn push_operator(items: &mut Vec<Item>, op: Operator, text: &str) -> Result<(), MatchError> {
    use Operator::*;
    let Some(&last) = items.last() else {
        if op == LParen || op == Not {
            items.push(Item::Operator(op));
            return Ok(());
        }
        return Err(MatchError::malformed(
            text,
            "expression may only begin with a clause, '(' or 'not'",
            Some(op.as_str()),
        ));
    };

    match (last, op) {
        (Item::Operator(LParen), And | Or) => {
            return Err(MatchError::malformed(
                text,
                format!("'{op}' cannot directly follow '('"),
                Some(op.as_str()),
            ));
        }
        (Item::Operator(And | Or | LParen), Not) => {}
        (_, Not) => items.push(Item::Operator(And)),
        _ => {}
    }
    items.push(Item::Operator(op));
    Ok(())
}

fn dispatch(
    engines: &EngineRegistry,
    engine: EngineId,
    descriptor: &ClauseDescriptor,
    clause: &str,
    ctx: &MatchContext,
    text: &str,
) -> Result<bool, MatchError> {
    let Some(matcher) = engines.get(engine) else {
        return Err(MatchError::UnknownEngine {
            expression: text.to_string(),
            engine,
            clause: clause.to_string(),
        });
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        matcher.matches(&descriptor.pattern, ctx, descriptor.delimiter)
    }));
    let source = match outcome {
        Ok(Ok(verdict)) => return Ok(verdict),
        Ok(Err(err)) => err,
        Err(payload) => anyhow!("matcher panicked: {}", panic_message(&*payload)),
    };

    Err(MatchError::EngineExecutionFailure {
        expression: text.to_string(),
        engine,
        clause: clause.to_string(),
        source,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
