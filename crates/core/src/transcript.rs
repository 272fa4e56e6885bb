//! Transcript record types.
//!
//! A [`RawRecord`] is one line of an uploaded chat export, exactly as the
//! export carried it. The normalizer turns raw records into
//! [`CanonicalMessage`]s, which are immutable for the life of the index
//! built from them.

use serde::{Deserialize, Serialize};

/// Placeholder text WhatsApp writes in place of attachments.
pub const MEDIA_OMITTED: &str = "<Media omitted>";

/// One record of an uploaded transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Display name of whoever sent the line
    pub sender: String,

    /// The message text
    pub message: String,

    /// Ignorable fields carried by the export (date, time, ...)
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawRecord {
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A cleaned, deduplicated transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    /// Trimmed sender name
    pub sender: String,

    /// First whitespace-delimited token of the sender; the persona identifier
    pub role: String,

    /// Trimmed, non-empty message text
    pub message: String,
}

impl CanonicalMessage {
    /// Render as a dialogue line: `"<sender>: <message>"`.
    pub fn dialogue_line(&self) -> String {
        format!("{}: {}", self.sender, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_keeps_extra_fields() {
        let json = r#"{"date":"01/02/2024","time":"10:15","sender":"Alice Smith","message":"hi"}"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.sender, "Alice Smith");
        assert_eq!(record.message, "hi");
        assert_eq!(record.extra.get("date").and_then(|v| v.as_str()), Some("01/02/2024"));
    }

    #[test]
    fn dialogue_line_format() {
        let msg = CanonicalMessage {
            sender: "Alice Smith".into(),
            role: "Alice".into(),
            message: "see you at 3".into(),
        };
        assert_eq!(msg.dialogue_line(), "Alice Smith: see you at 3");
    }
}
