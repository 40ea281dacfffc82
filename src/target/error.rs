//! Reasons a compound target expression fails to evaluate.

use crate::engine::EngineId;
use thiserror::Error;

/// A failed evaluation.
///
/// Every variant carries the original expression text so that a logged diagnostic is enough for
/// an operator to find and fix the problem. Callers that only need a verdict should use
/// [crate::target::compound_match], which treats every failure as "no match".
#[derive(Debug, Error)]
pub enum MatchError {
    /// The expression isn't valid compound-target syntax.
    #[error(
        "malformed target expression \"{expression}\": {reason}{}",
        detail(.token, .composed)
    )]
    MalformedExpression {
        expression: String,
        reason: String,
        /// The offending token, when one can be singled out.
        token: Option<String>,
        /// The classified expression, with clause results as `True`/`False`, when evaluation got
        /// that far.
        composed: Option<String>,
    },

    /// A clause asked for an engine that the registry doesn't provide.
    #[error("unrecognized target engine {engine} for clause \"{clause}\" in \"{expression}\"")]
    UnknownEngine {
        expression: String,
        engine: EngineId,
        clause: String,
    },

    /// An engine returned an error (or panicked) while matching a clause.
    #[error("{engine} engine failed on clause \"{clause}\" in \"{expression}\": {source:#}")]
    EngineExecutionFailure {
        expression: String,
        engine: EngineId,
        clause: String,
        source: anyhow::Error,
    },

    /// A nodegroup references itself, directly or indirectly, or expands past the configured
    /// bounds.
    #[error("failed to expand nodegroup \"{nodegroup}\" in \"{expression}\": {reason}")]
    NodegroupExpansionOverflow {
        expression: String,
        nodegroup: String,
        reason: String,
    },

    /// A clause referenced a nodegroup that isn't defined.
    #[error("unknown nodegroup \"{nodegroup}\" in \"{expression}\"")]
    UnknownNodegroup {
        expression: String,
        nodegroup: String,
    },
}

fn detail(token: &Option<String>, composed: &Option<String>) -> String {
    let mut out = String::new();
    if let Some(token) = token {
        out.push_str(&format!(" (at \"{token}\")"));
    }
    if let Some(composed) = composed {
        out.push_str(&format!("; composed as \"{composed}\""));
    }
    out
}

impl MatchError {
    /// The original expression text that failed.
    pub fn expression(&self) -> &str {
        use MatchError::*;
        match self {
            MalformedExpression { expression, .. }
            | UnknownEngine { expression, .. }
            | EngineExecutionFailure { expression, .. }
            | NodegroupExpansionOverflow { expression, .. }
            | UnknownNodegroup { expression, .. } => expression,
        }
    }

    /// A short, stable name for the kind of failure, suitable for structured log fields.
    pub fn kind(&self) -> &'static str {
        use MatchError::*;
        match self {
            MalformedExpression { .. } => "malformed_expression",
            UnknownEngine { .. } => "unknown_engine",
            EngineExecutionFailure { .. } => "engine_execution_failure",
            NodegroupExpansionOverflow { .. } => "nodegroup_expansion_overflow",
            UnknownNodegroup { .. } => "unknown_nodegroup",
        }
    }

    pub(crate) fn malformed(
        expression: &str,
        reason: impl Into<String>,
        token: Option<&str>,
    ) -> Self {
        MatchError::MalformedExpression {
            expression: expression.to_string(),
            reason: reason.into(),
            token: token.map(str::to_string),
            composed: None,
        }
    }
}
