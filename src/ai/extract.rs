//! Completion replies are free text that is only *expected* to carry a
//! JSON payload: models wrap it in markdown fences, preface it with
//! prose, or append commentary after it. One extraction routine handles
//! all of those shapes so every caller tolerates the same set of quirks.

use serde_json::Value;
use thiserror::Error;

pub type ExtractResult<T> = core::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("reply contains no JSON payload")]
    NoPayload,

    #[error("payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("expected a JSON {expected}, found {found}")]
    WrongShape {
        expected: &'static str,
        found: &'static str,
    },
}

/// Pulls the outermost JSON object or array out of a free-text reply.
pub fn extract_payload(reply: &str) -> ExtractResult<Value> {
    let stripped = strip_fences(reply);
    let span = payload_span(stripped).ok_or(ExtractError::NoPayload)?;

    Ok(serde_json::from_str(span)?)
}

pub fn extract_object(reply: &str) -> ExtractResult<serde_json::Map<String, Value>> {
    match extract_payload(reply)? {
        Value::Object(map) => Ok(map),
        other => Err(ExtractError::WrongShape {
            expected: "object",
            found: kind(&other),
        }),
    }
}

pub fn extract_array(reply: &str) -> ExtractResult<Vec<Value>> {
    // Prose around a list can carry stray braces ("some {tips} for
    // you"), which would win the object-first scan; the bracket span
    // gets the first attempt.
    let stripped = strip_fences(reply);
    if let Some(span) = span_between(stripped, '[', ']') {
        if let Ok(Value::Array(items)) = serde_json::from_str(span) {
            return Ok(items);
        }
    }

    match extract_payload(reply)? {
        Value::Array(items) => Ok(items),
        other => Err(ExtractError::WrongShape {
            expected: "array",
            found: kind(&other),
        }),
    }
}

/// Drops a surrounding markdown code fence, with or without a language
/// tag. Best effort; `payload_span` does the real work afterwards.
fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };

    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Spans from whichever of `{` or `[` appears first through the matching
/// last closer. Surrounding prose falls away; unbalanced text yields
/// `None`.
fn payload_span(text: &str) -> Option<&str> {
    let (open, close) = match (text.find('{'), text.find('[')) {
        (Some(o), Some(a)) if a < o => ('[', ']'),
        (Some(_), _) => ('{', '}'),
        (None, Some(_)) => ('[', ']'),
        (None, None) => return None,
    };

    span_between(text, open, close)
}

fn span_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;

    (end > start).then(|| &text[start..=end])
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
