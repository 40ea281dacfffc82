//! Cluster range expressions (`R@`). Only compiled with the `range` feature.
//!
//! A range expression is a comma-separated union of host expressions. Each host expression may
//! contain one numeric range in brackets, e.g. `web[01-12].example.com`. The numbers are
//! zero-padded to the width of the range's start.

use crate::context::MatchContext;
use anyhow::{anyhow, bail};

/// Upper bound on the number of names one range expression may expand to.
pub const MAX_RANGE_HOSTS: usize = 65_536;

/// Returns whether the agent's identity is one of the hosts named by the range expression.
///
/// # Errors
///
/// Returns an error if the expression is malformed or expands to more than [MAX_RANGE_HOSTS]
/// names.
pub fn range_match(
    pattern: &str,
    ctx: &MatchContext,
    _delimiter: Option<char>,
) -> anyhow::Result<bool> {
    Ok(expand(pattern)?.iter().any(|host| *host == ctx.id))
}

/// Expands a range expression into the host names it denotes, in order.
pub fn expand(expression: &str) -> anyhow::Result<Vec<String>> {
    let mut hosts = Vec::new();
    for part in expression.split(',') {
        if part.is_empty() {
            continue;
        }
        expand_part(part, &mut hosts)?;
        if hosts.len() > MAX_RANGE_HOSTS {
            bail!("range expression expands to more than {MAX_RANGE_HOSTS} hosts: {expression}");
        }
    }
    Ok(hosts)
}

fn expand_part(part: &str, hosts: &mut Vec<String>) -> anyhow::Result<()> {
    let Some(open) = part.find('[') else {
        hosts.push(part.to_string());
        return Ok(());
    };
    let close = part[open..]
        .find(']')
        .map(|i| open + i)
        .ok_or_else(|| anyhow!("unterminated '[' in range expression: {part}"))?;

    let (prefix, suffix) = (&part[..open], &part[close + 1..]);
    if suffix.contains('[') {
        bail!("only one numeric range is allowed per host: {part}");
    }

    let body = &part[open + 1..close];
    let (start, end) = body
        .split_once('-')
        .ok_or_else(|| anyhow!("expected [start-end] in range expression: {part}"))?;
    let width = start.len();
    let start: u64 = start
        .parse()
        .map_err(|_| anyhow!("invalid range start in {part}"))?;
    let end: u64 = end
        .parse()
        .map_err(|_| anyhow!("invalid range end in {part}"))?;
    if start > end {
        bail!("range start is greater than range end: {part}");
    }
    if end - start >= MAX_RANGE_HOSTS as u64 {
        bail!("range expression expands to more than {MAX_RANGE_HOSTS} hosts: {part}");
    }

    for n in start..=end {
        hosts.push(format!("{prefix}{n:0width$}{suffix}"));
    }
    Ok(())
}
