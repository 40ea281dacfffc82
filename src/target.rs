//! Compound target matching.
//!
//! A compound target combines clauses for different matcher engines with `and`, `or`, `not`, and
//! parentheses:
//!
//! ```text
//! G@os:Debian and ( web* or E@db\d+ ) and not L@web13,web14
//! ```
//!
//! Evaluation happens in two passes. [classify::classify] walks the tokens, expands nodegroups,
//! and asks the engine registry for a verdict on each clause. [eval::evaluate] then checks that
//! what's left is a well-formed boolean expression and reduces it to one verdict.
//!
//! Operators must be separated from clauses by whitespace. `(web*` is a glob that happens to
//! start with a parenthesis.

pub mod classify;
pub mod clause;
pub mod error;
pub mod eval;
pub mod expression;
pub mod fleet;
pub mod nodegroup;

pub use clause::ClauseDescriptor;
pub use error::MatchError;
pub use expression::{Operator, TargetExpression, Token};
pub use fleet::match_fleet;
pub use nodegroup::{NodegroupDefinition, NodegroupTable};

use crate::context::MatchContext;
use crate::engine::EngineRegistry;
use tracing::{debug, error};

/// Evaluates `expression` for the agent described by `ctx`.
///
/// Neither the expression nor any of the borrowed arguments is modified, and nothing is retained
/// between calls, so this may be called concurrently from any number of threads.
///
/// # Errors
///
/// Returns a [MatchError] if the expression is malformed, names an engine that `engines` lacks,
/// references a nodegroup that can't be expanded, or if an engine fails.
///
/// # Example
///
/// ```
/// use herd::context::MatchContext;
/// use herd::engine::EngineRegistry;
/// use herd::target::{evaluate_target, NodegroupTable};
///
/// let ctx = MatchContext::new("web01")
///     .with_grains(serde_yaml::from_str("os: Debian").unwrap());
/// let engines = EngineRegistry::standard();
/// let nodegroups = NodegroupTable::new();
///
/// let verdict = evaluate_target("G@os:Debian and web*", &ctx, &engines, &nodegroups);
/// assert!(verdict.unwrap());
/// ```
pub fn evaluate_target(
    expression: impl Into<TargetExpression>,
    ctx: &MatchContext,
    engines: &EngineRegistry,
    nodegroups: &NodegroupTable,
) -> Result<bool, MatchError> {
    evaluate(&expression.into(), ctx, engines, nodegroups)
}

/// Like [evaluate_target], but any failure is logged and treated as "no match".
pub fn compound_match(
    expression: impl Into<TargetExpression>,
    ctx: &MatchContext,
    engines: &EngineRegistry,
    nodegroups: &NodegroupTable,
) -> bool {
    let expression = expression.into();
    match evaluate(&expression, ctx, engines, nodegroups) {
        Ok(verdict) => verdict,
        Err(err) => {
            error!(kind = err.kind(), id = %ctx.id, "invalid compound target: {err}");
            false
        }
    }
}

pub(crate) fn evaluate(
    expression: &TargetExpression,
    ctx: &MatchContext,
    engines: &EngineRegistry,
    nodegroups: &NodegroupTable,
) -> Result<bool, MatchError> {
    let items = classify::classify(expression, ctx, engines, nodegroups)?;
    let text = expression.text();
    let verdict = eval::evaluate(&items, &text)?;
    debug!(
        "compound target {text} for {} composed as {} => {verdict}",
        ctx.id,
        classify::compose(&items),
    );
    Ok(verdict)
}
