//! Explicit identity lists (`L@`).

use crate::context::MatchContext;

/// Returns whether the agent's identity is one of the comma-separated names in `pattern`.
///
/// Names are compared exactly; there is no globbing and no whitespace trimming.
pub fn list_match(
    pattern: &str,
    ctx: &MatchContext,
    _delimiter: Option<char>,
) -> anyhow::Result<bool> {
    Ok(pattern.split(',').any(|name| name == ctx.id))
}
