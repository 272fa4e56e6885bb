//! Channel trait — the abstraction over chat front ends.
//!
//! A Channel connects Mimic to wherever users talk to it (a terminal, a
//! chat-platform DM). It yields inbound messages, possibly carrying an
//! uploaded transcript, and sends replies back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The channel this message belongs to
    pub channel_id: ChannelId,

    /// Sender identifier (platform-specific user ID)
    pub sender_id: String,

    /// The text content
    pub content: String,

    /// The chat/DM identifier within the channel
    pub chat_id: String,

    /// Uploaded files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// A file uploaded alongside a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original filename, used to recognise `.json` transcripts
    pub filename: String,

    /// URL or local path the content can be read from
    pub location: String,
}

impl Attachment {
    /// Whether this looks like a JSON transcript export.
    pub fn is_json(&self) -> bool {
        self.filename.to_ascii_lowercase().ends_with(".json")
    }
}

/// The core Channel trait.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "cli", "discord").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Start listening for incoming messages.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Send a message to a specific chat.
    async fn send(&self, chat_id: &str, content: &str) -> std::result::Result<(), ChannelError>;

    /// Send a typing indicator (if the platform supports it).
    async fn send_typing(&self, _chat_id: &str) -> std::result::Result<(), ChannelError> {
        Ok(()) // No-op default
    }

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_attachment_detection() {
        let json = Attachment {
            filename: "Chat With Bob.JSON".into(),
            location: "/tmp/chat.json".into(),
        };
        assert!(json.is_json());

        let txt = Attachment {
            filename: "_chat.txt".into(),
            location: "/tmp/_chat.txt".into(),
        };
        assert!(!txt.is_json());
    }

    #[test]
    fn channel_message_serialization_skips_empty_attachments() {
        let msg = ChannelMessage {
            channel_id: ChannelId("cli".into()),
            sender_id: "local_user".into(),
            content: "hello".into(),
            chat_id: "cli_session".into(),
            attachments: vec![],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("attachments"));
    }
}
