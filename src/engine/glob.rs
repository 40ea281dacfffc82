//! Shell-style glob matching, used for clauses that carry no engine prefix.

use crate::context::MatchContext;
use regex::{Regex, RegexBuilder};

/// Matches the agent's identity against a shell-style glob. Case-sensitive.
///
/// Supports `*`, `?`, `[seq]`, and `[!seq]`. An unterminated `[` matches itself literally.
pub fn glob_match(
    pattern: &str,
    ctx: &MatchContext,
    _delimiter: Option<char>,
) -> anyhow::Result<bool> {
    Ok(compile(pattern, false)?.is_match(&ctx.id))
}

/// Returns whether `text` matches the glob `pattern`.
///
/// With `case_insensitive` set, letters match regardless of case.
pub fn fnmatch(text: &str, pattern: &str, case_insensitive: bool) -> anyhow::Result<bool> {
    Ok(compile(pattern, case_insensitive)?.is_match(text))
}

/// Compiles a glob into an anchored [Regex].
pub fn compile(pattern: &str, case_insensitive: bool) -> anyhow::Result<Regex> {
    let regex = RegexBuilder::new(&translate(pattern))
        .case_insensitive(case_insensitive)
        .build()?;
    Ok(regex)
}

/// Translates a glob into equivalent regex source, anchored at both ends.
pub fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                // Collapse runs of '*'; they mean the same thing.
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut out, &chars[i..end]);
                    i = end + 1;
                }
                None => out.push_str(r"\["),
            },
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }

    out.push('$');
    out
}

/// Given the index just past a `[`, returns the index of the `]` that closes the class.
///
/// A `!` or `]` right after the opening bracket is part of the class rather than a terminator.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

/// Writes a regex character class for the glob class body `body` (without brackets).
///
/// A range whose start sorts after its end, like `z-a`, matches nothing and is dropped.
fn push_class(out: &mut String, body: &[char]) {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut class = String::new();
    let mut i = 0;
    while i < body.len() {
        match body.get(i..i + 3) {
            Some(&[lo, '-', hi]) => {
                if lo <= hi {
                    push_class_char(&mut class, lo);
                    class.push('-');
                    push_class_char(&mut class, hi);
                }
                i += 3;
            }
            _ => {
                push_class_char(&mut class, body[i]);
                i += 1;
            }
        }
    }

    // An empty class can't match anything, and a negated empty class matches any character.
    if class.is_empty() {
        out.push_str(if negated { "." } else { "[^\\s\\S]" });
        return;
    }

    out.push('[');
    if negated {
        out.push('^');
    }
    out.push_str(&class);
    out.push(']');
}

fn push_class_char(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~' | '-') {
        out.push('\\');
    }
    out.push(c);
}
