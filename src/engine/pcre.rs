//! Regular-expression matching on the agent's identity (`E@`).

use crate::context::MatchContext;
use anyhow::Context;
use regex::RegexBuilder;

/// Returns whether `pattern` matches the agent's identity, starting at its first character.
///
/// The match is anchored at the start only, so `web` matches `web01` but `eb` does not. Add a
/// trailing `$` to require a full match.
///
/// # Errors
///
/// Returns an error if `pattern` is not a valid regular expression.
pub fn pcre_match(
    pattern: &str,
    ctx: &MatchContext,
    _delimiter: Option<char>,
) -> anyhow::Result<bool> {
    match_start(pattern, &ctx.id, false)
}

/// Returns whether `pattern` matches a prefix of `text`.
///
/// The pattern is compiled exactly as given. Searches are leftmost-first, so a match that
/// starts at offset 0 exists if and only if the first match found starts there.
pub fn match_start(pattern: &str, text: &str, case_insensitive: bool) -> anyhow::Result<bool> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .with_context(|| format!("invalid regular expression: {pattern}"))?;
    Ok(regex.find(text).is_some_and(|m| m.start() == 0))
}
