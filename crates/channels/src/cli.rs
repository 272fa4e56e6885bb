//! CLI channel — interactive terminal chat.
//!
//! Reads lines from stdin (or any injected reader), writes replies to
//! stdout. `/upload <path>` turns a local file into an attachment so the
//! terminal behaves like a chat app that accepts file uploads.

use std::path::Path;

use async_trait::async_trait;
use mimic_core::channel::{Attachment, Channel, ChannelId, ChannelMessage};
use mimic_core::error::ChannelError;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// Sender id reported for the terminal user.
pub const LOCAL_USER: &str = "local_user";

const CHAT_ID: &str = "cli_session";

type InputReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// What one input line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    /// Blank line.
    Skip,
    /// Leave the chat.
    Exit,
    /// Forward to the host.
    Message {
        content: String,
        attachments: Vec<Attachment>,
    },
}

/// Classify one line of terminal input.
pub fn parse_line(line: &str) -> LineAction {
    let line = line.trim();
    if line.is_empty() {
        return LineAction::Skip;
    }

    if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
        return LineAction::Exit;
    }

    if let Some(path) = line.strip_prefix("/upload ") {
        let path = path.trim();
        if !path.is_empty() {
            let filename = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string());
            return LineAction::Message {
                content: String::new(),
                attachments: vec![Attachment {
                    filename,
                    location: path.to_string(),
                }],
            };
        }
    }

    LineAction::Message {
        content: line.to_string(),
        attachments: vec![],
    }
}

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
    input: Mutex<Option<InputReader>>,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("cli".into()),
            input: Mutex::new(None),
        }
    }

    /// Read from `reader` instead of stdin.
    pub fn with_input(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            id: ChannelId("cli".into()),
            input: Mutex::new(Some(Box::new(reader))),
        }
    }

    /// The chat id every message from this channel carries.
    pub fn chat_id(&self) -> &str {
        CHAT_ID
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();
        let reader: InputReader = match self.input.lock().await.take() {
            Some(reader) => reader,
            None => Box::new(BufReader::new(io::stdin())),
        };

        tokio::spawn(async move {
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let (content, attachments) = match parse_line(&line) {
                            LineAction::Skip => continue,
                            LineAction::Exit => {
                                debug!("Exit requested");
                                break;
                            }
                            LineAction::Message {
                                content,
                                attachments,
                            } => (content, attachments),
                        };

                        let msg = ChannelMessage {
                            channel_id: channel_id.clone(),
                            sender_id: LOCAL_USER.into(),
                            content,
                            chat_id: CHAT_ID.into(),
                            attachments,
                        };

                        if tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, _chat_id: &str, content: &str) -> Result<(), ChannelError> {
        println!("{content}");
        Ok(())
    }
}
