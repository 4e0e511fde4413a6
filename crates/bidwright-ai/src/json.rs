//! Tolerant JSON extraction from model output.
//!
//! Models asked for "only JSON" still wrap it in markdown fences or a
//! sentence of preamble. Stages, first success wins:
//!
//! 1. the trimmed text as is
//! 2. the body of a leading ```` ``` ```` / ```` ```json ```` fence
//! 3. the outermost balanced `{...}` object (string literals respected)

use bidwright_core::text::ellipsize;
use serde::de::DeserializeOwned;

use crate::ParseError;

const PREVIEW_CHARS: usize = 200;

/// Parse `raw` as `T`, stripping common non-JSON wrapping.
pub fn parse_lenient<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let trimmed = raw.trim();
    let mut last_err = None;

    let stages = [Some(trimmed), strip_fence(trimmed), outermost_object(trimmed)];
    for candidate in stages.into_iter().flatten() {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
    }

    let preview = ellipsize(trimmed, PREVIEW_CHARS);
    match (last_err, outermost_object(trimmed)) {
        (Some(source), Some(_)) => Err(ParseError::Schema { source, preview }),
        _ => Err(ParseError::NoJson { preview }),
    }
}

/// Body of a ```` ``` ```` fence, with or without a language tag.
fn strip_fence(s: &str) -> Option<&str> {
    let rest = s.strip_prefix("```")?;
    // Drop the info string (`json`, `JSON`, ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    let body = body.trim_end();
    Some(body.strip_suffix("```").unwrap_or(body).trim())
}

/// Slice from the first `{` to its matching `}`.
fn outermost_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
