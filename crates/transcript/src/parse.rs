//! Strict transcript parsing.
//!
//! Every record must be a JSON object with string `sender` and `message`
//! fields. A record that breaks the schema rejects the whole upload with
//! its position, rather than being read through lenient fallbacks.

use mimic_core::error::TranscriptError;
use mimic_core::transcript::RawRecord;
use serde_json::Value;

use crate::flatten::flatten_nested;

/// Parse an uploaded transcript in either supported shape.
///
/// - a JSON array of flat records
/// - a nested `{date: {time: [records]}}` object
pub fn parse_transcript(bytes: &[u8]) -> Result<Vec<RawRecord>, TranscriptError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| TranscriptError::Json(e.to_string()))?;

    match value {
        Value::Array(items) => parse_records(&items),
        Value::Object(_) => parse_records(&flatten_nested(&value)?),
        other => Err(TranscriptError::UnsupportedShape(format!(
            "expected an array or object at the top level, found {}",
            kind_of(&other)
        ))),
    }
}

/// Validate a sequence of JSON values as raw records.
pub fn parse_records(items: &[Value]) -> Result<Vec<RawRecord>, TranscriptError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(TranscriptError::MalformedRecord {
                    index,
                    reason: format!("expected an object, found {}", kind_of(item)),
                });
            }
            serde_json::from_value::<RawRecord>(item.clone()).map_err(|e| {
                TranscriptError::MalformedRecord {
                    index,
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
