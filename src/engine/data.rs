//! Grain and pillar matching (`G@`, `P@`, `I@`, `J@`).
//!
//! All four engines share one lookup algorithm, [subdict_match]. A clause such as
//! `G@os:Ubuntu` names a key path and a value, separated by the delimiter (`:` unless the clause
//! specifies another one). Because values may contain the delimiter too, every split point is
//! tried, deepest key path first: `a:b:c` is tried as key `a:b` with value `c`, then as key `a`
//! with value `b:c`.
//!
//! Values are compared case-insensitively, as globs for the plain engines and as start-anchored
//! regular expressions for the `_pcre` engines. [pillar_exact_match] compares pillar values for
//! plain equality; see [crate::engine::EngineRegistry::with_exact_pillar].

use super::{glob, pcre, DEFAULT_TARGET_DELIM};
use crate::context::MatchContext;
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

/// How a looked-up value is compared with the pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    /// Case-insensitive shell glob.
    Glob,
    /// Case-insensitive regex, anchored at the start.
    Regex,
    /// Case-insensitive equality. Wildcards and regex syntax are taken literally.
    Exact,
}

/// `G@`: glob-matches a grain.
pub fn grain_match(
    pattern: &str,
    ctx: &MatchContext,
    delimiter: Option<char>,
) -> anyhow::Result<bool> {
    data_match("grains", &ctx.grains, pattern, delimiter, Comparison::Glob)
}

/// `P@`: regex-matches a grain.
pub fn grain_pcre_match(
    pattern: &str,
    ctx: &MatchContext,
    delimiter: Option<char>,
) -> anyhow::Result<bool> {
    data_match("grains", &ctx.grains, pattern, delimiter, Comparison::Regex)
}

/// `I@`: glob-matches a pillar value.
pub fn pillar_match(
    pattern: &str,
    ctx: &MatchContext,
    delimiter: Option<char>,
) -> anyhow::Result<bool> {
    data_match("pillar", &ctx.pillar, pattern, delimiter, Comparison::Glob)
}

/// `J@`: regex-matches a pillar value.
pub fn pillar_pcre_match(
    pattern: &str,
    ctx: &MatchContext,
    delimiter: Option<char>,
) -> anyhow::Result<bool> {
    data_match("pillar", &ctx.pillar, pattern, delimiter, Comparison::Regex)
}

/// `I@`/`J@` in exact mode: the pillar value must equal the pattern, ignoring case.
pub fn pillar_exact_match(
    pattern: &str,
    ctx: &MatchContext,
    delimiter: Option<char>,
) -> anyhow::Result<bool> {
    data_match("pillar", &ctx.pillar, pattern, delimiter, Comparison::Exact)
}

fn data_match(
    source: &str,
    data: &Value,
    pattern: &str,
    delimiter: Option<char>,
    comparison: Comparison,
) -> anyhow::Result<bool> {
    let delimiter = delimiter.unwrap_or(DEFAULT_TARGET_DELIM);
    if !pattern.contains(delimiter) {
        warn!("{source} match needs a key and a value separated by '{delimiter}': {pattern}");
        return Ok(false);
    }
    subdict_match(data, pattern, delimiter, comparison)
}

/// Checks for a match in nested data, using `delimiter` to separate levels of the key path from
/// each other and from the value.
///
/// `foo:bar:baz` matches both `data["foo"] == "bar:baz"` and `data["foo"]["bar"] == "baz"`; the
/// more deeply nested interpretation is tried first. Sequences along the path may be indexed
/// numerically or searched for embedded mappings that contain the next key.
///
/// # Errors
///
/// Returns an error only for [Comparison::Regex] when the value pattern is not a valid regular
/// expression.
pub fn subdict_match(
    data: &Value,
    expr: &str,
    delimiter: char,
    comparison: Comparison,
) -> anyhow::Result<bool> {
    let splits: Vec<&str> = expr.split(delimiter).collect();
    if splits.len() == 1 {
        return Ok(false);
    }

    let delim = delimiter.to_string();
    for idx in (1..splits.len()).rev() {
        let key = splits[..idx].join(&delim);
        let (target, value_pattern) = if key == "*" {
            // Match against everything under the top level.
            (Some(data), expr.to_string())
        } else {
            (
                traverse_dict_and_list(data, &key, delimiter),
                splits[idx..].join(&delim),
            )
        };
        debug!("attempting to match '{value_pattern}' in '{key}' using delimiter '{delimiter}'");

        match target {
            None => continue,
            Some(Value::Mapping(map)) if map.is_empty() => continue,
            Some(Value::Mapping(map)) => {
                if dict_match(map, &value_pattern, comparison)? {
                    return Ok(true);
                }
            }
            Some(Value::Sequence(members)) => {
                for member in members {
                    if let Value::Mapping(map) = member {
                        if dict_match(map, &value_pattern, comparison)? {
                            return Ok(true);
                        }
                    }
                    if value_match(member, &value_pattern, comparison)? {
                        return Ok(true);
                    }
                }
            }
            Some(scalar) => {
                if value_match(scalar, &value_pattern, comparison)? {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

/// Looks up a delimited key path in nested mappings and sequences.
///
/// Returns [None] if any step of the path is missing. Numeric segments index into sequences; a
/// non-numeric segment applied to a sequence looks for the first embedded mapping containing that
/// key. A mapping key that isn't found as a string is retried as a YAML scalar, so `1` finds an
/// integer key and `true` finds a boolean key.
pub fn traverse_dict_and_list<'d>(
    data: &'d Value,
    key: &str,
    delimiter: char,
) -> Option<&'d Value> {
    let mut ptr = data;
    for segment in key.split(delimiter) {
        ptr = match ptr {
            Value::Sequence(seq) => match segment.parse::<usize>() {
                Ok(idx) => seq
                    .iter()
                    .filter_map(Value::as_mapping)
                    .find_map(|m| m.get(Value::Number(idx.into())))
                    .or_else(|| seq.get(idx))?,
                Err(_) => seq
                    .iter()
                    .filter_map(Value::as_mapping)
                    .find_map(|m| m.get(segment))?,
            },
            Value::Mapping(map) => mapping_get(map, segment)?,
            _ => return None,
        };
    }
    Some(ptr)
}

fn mapping_get<'d>(map: &'d Mapping, segment: &str) -> Option<&'d Value> {
    if let Some(value) = map.get(segment) {
        return Some(value);
    }

    let loaded: Value = serde_yaml::from_str(segment).ok()?;
    match loaded {
        Value::String(ref s) if s == segment => None,
        Value::Null | Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
        loaded => map.get(loaded),
    }
}

fn dict_match(target: &Mapping, pattern: &str, comparison: Comparison) -> anyhow::Result<bool> {
    let (wildcard, pattern) = match pattern.strip_prefix("*:") {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };

    // `*` only checks that the key exists, and a bare key name matches a key.
    if pattern == "*" || target.contains_key(pattern) {
        return Ok(true);
    }

    let nested = Value::Mapping(target.clone());
    if subdict_match(&nested, pattern, DEFAULT_TARGET_DELIM, comparison)? {
        return Ok(true);
    }

    if wildcard {
        for value in target.values() {
            let matched = match value {
                Value::Mapping(map) => dict_match(map, pattern, comparison)?,
                Value::Sequence(items) => {
                    let mut any = false;
                    for item in items {
                        if value_match(item, pattern, comparison)? {
                            any = true;
                            break;
                        }
                    }
                    any
                }
                scalar => value_match(scalar, pattern, comparison)?,
            };
            if matched {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Compares a scalar value with a pattern, case-insensitively.
fn value_match(target: &Value, pattern: &str, comparison: Comparison) -> anyhow::Result<bool> {
    let Some(target) = scalar_text(target) else {
        return Ok(false);
    };

    match comparison {
        Comparison::Glob => glob::fnmatch(&target, pattern, true),
        Comparison::Regex => pcre::match_start(pattern, &target, true),
        Comparison::Exact => Ok(target.to_lowercase() == pattern.to_lowercase()),
    }
}

/// Renders a scalar as text for comparison. Collections have no text form.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some("none".to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
