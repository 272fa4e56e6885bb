//! Nested export flattening.
//!
//! Some exports group lines as `{date: {time: [ {sender, message}, ... ]}}`.
//! Flattening yields one object per line carrying `date`, `time`, `sender`
//! and `message`, in document order.

use mimic_core::error::TranscriptError;
use serde_json::{Map, Value};

/// Flatten a nested `date → time → [records]` object into flat records.
///
/// Times are cleaned of narrow no-break spaces (U+202F, common in 12-hour
/// exports) and trimmed. Record fields other than `sender`/`message` are
/// carried over. Records are not schema-checked here.
pub fn flatten_nested(value: &Value) -> Result<Vec<Value>, TranscriptError> {
    let dates = value.as_object().ok_or_else(|| {
        TranscriptError::UnsupportedShape("nested transcript must be an object".into())
    })?;

    let mut flat = Vec::new();
    for (date, times) in dates {
        let times = times.as_object().ok_or_else(|| {
            TranscriptError::UnsupportedShape(format!("date '{date}' must map times to lists"))
        })?;

        for (time, records) in times {
            let records = records.as_array().ok_or_else(|| {
                TranscriptError::UnsupportedShape(format!(
                    "time '{date} {time}' must hold a list of records"
                ))
            })?;

            let time = time.replace('\u{202f}', " ").trim().to_string();
            for record in records {
                let mut out = Map::new();
                out.insert("date".into(), Value::String(date.clone()));
                out.insert("time".into(), Value::String(time.clone()));
                match record {
                    Value::Object(fields) => {
                        for (k, v) in fields {
                            out.insert(k.clone(), v.clone());
                        }
                    }
                    // Leave non-objects in place so validation reports them.
                    other => {
                        flat.push(other.clone());
                        continue;
                    }
                }
                flat.push(Value::Object(out));
            }
        }
    }

    Ok(flat)
}
