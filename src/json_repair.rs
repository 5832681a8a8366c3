//! Local recovery of JSON objects from LLM output.
//!
//! Models asked for "JSON only" still wrap answers in markdown fences or add a
//! sentence before the object. These helpers try, in order: the whole text, the
//! first fenced block, and finally the outermost `{ ... }` span.

use serde_json::{Map, Value};

/// Parses `text` as a JSON object without any network fallback.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    if let Some(object) = parse_object(trimmed) {
        return Some(object);
    }
    if let Some(object) = fenced_block(trimmed).and_then(parse_object) {
        return Some(object);
    }
    embedded_object(trimmed).and_then(parse_object)
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Returns the body of the first ``` fence, skipping an optional language tag.
pub fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = match after_fence.find('\n') {
        Some(newline) if after_fence[..newline].trim().chars().all(char::is_alphanumeric) => newline + 1,
        _ => 0,
    };
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn embedded_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
