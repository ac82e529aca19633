//! Turning the agent's final text into JSON records

use serde_json::Value;
use trialscout_error::{Error, Result};

/// Strip a surrounding markdown code fence (```` ``` ```` or ```` ```json ````,
/// tag matched case-insensitively) plus surrounding whitespace.
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Parse the agent's reply as a JSON array.
///
/// Fails with `ParseFailed` when the text is not JSON, and `ShapeMismatch`
/// when it is JSON of another type. Both keep the raw reply under the `raw`
/// context key.
pub fn parse_records(raw: &str) -> Result<Vec<Value>> {
    let body = strip_fences(raw);

    let value: Value = serde_json::from_str(body).map_err(|e| {
        Error::parse_failed(format!("reply is not valid JSON: {}", e), raw)
            .with_operation("normalize::parse_records")
    })?;

    match value {
        Value::Array(items) => Ok(items),
        other => Err(Error::shape_mismatch("array", json_type(&other), raw)
            .with_operation("normalize::parse_records")),
    }
}

pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
