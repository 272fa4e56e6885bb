//! `mimic chat` — Chat with a persona from an uploaded transcript.
//!
//! [`ChatHost`] is the glue between a [`Channel`] and the pipeline: it maps
//! each inbound message to an upload, a persona command or a reply, and
//! answers with the same short status lines a chat bot would.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use mimic_agent::context::token;
use mimic_agent::{MimicPipeline, ReplyOutcome};
use mimic_channels::{CliChannel, LOCAL_USER};
use mimic_config::AppConfig;
use mimic_core::channel::{Attachment, Channel, ChannelMessage};
use mimic_core::error::{ChannelError, Error, TranscriptError};
use mimic_core::session::{InMemorySessionStore, SessionStore, UserId};
use mimic_providers::router;
use tracing::{debug, warn};

const PROCESSING: &str = "⏳ Processing chat…";
const NO_USABLE_LINES: &str = "❌ No usable lines found in chat.";

/// Routes channel messages to the pipeline.
pub struct ChatHost {
    pipeline: MimicPipeline,
    sessions: Arc<dyn SessionStore>,
    platform: String,
}

impl ChatHost {
    pub fn new(
        pipeline: MimicPipeline,
        sessions: Arc<dyn SessionStore>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            sessions,
            platform: platform.into(),
        }
    }

    /// Handle one inbound message, answering on `channel`.
    pub async fn handle(
        &self,
        channel: &dyn Channel,
        msg: &ChannelMessage,
    ) -> Result<(), ChannelError> {
        if let Some(attachment) = msg.attachments.first() {
            return self.upload(channel, msg, attachment).await;
        }

        let text = msg.content.trim();
        if text == "/personas" {
            return self.list_personas(channel, msg).await;
        }
        if let Some(role) = text.strip_prefix("/persona ") {
            return self.select_persona(channel, msg, role.trim()).await;
        }

        self.reply(channel, msg, text).await
    }

    async fn upload(
        &self,
        channel: &dyn Channel,
        msg: &ChannelMessage,
        attachment: &Attachment,
    ) -> Result<(), ChannelError> {
        if !attachment.is_json() {
            let notice = format!(
                "❌ Please upload a `.json` {} export file.",
                self.platform
            );
            return channel.send(&msg.chat_id, &notice).await;
        }

        channel.send(&msg.chat_id, PROCESSING).await?;

        let bytes = match tokio::fs::read(&attachment.location).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %attachment.location, error = %e, "Failed to read upload");
                return channel.send(&msg.chat_id, &error_line(e)).await;
            }
        };

        let handle = self.sessions.get_or_create(&user_of(msg)).await;
        let mut session = handle.lock().await;

        let answer = match self.pipeline.ingest(&mut session, &bytes).await {
            Ok(summary) => format!(
                "✅ Loaded {} messages. Pick a persona with `/persona NAME`: {}",
                summary.messages,
                summary.roles.join(", ")
            ),
            Err(Error::Transcript(TranscriptError::EmptyTranscript)) => NO_USABLE_LINES.into(),
            Err(e) => error_line(e),
        };
        channel.send(&msg.chat_id, &answer).await
    }

    async fn list_personas(
        &self,
        channel: &dyn Channel,
        msg: &ChannelMessage,
    ) -> Result<(), ChannelError> {
        let handle = self.sessions.get_or_create(&user_of(msg)).await;
        let session = handle.lock().await;

        let answer = if session.available_roles.is_empty() {
            format!("📥 {}", self.pipeline.guidance())
        } else {
            let roles: Vec<&str> = session.available_roles.iter().map(String::as_str).collect();
            format!("Personas: {}", roles.join(", "))
        };
        channel.send(&msg.chat_id, &answer).await
    }

    async fn select_persona(
        &self,
        channel: &dyn Channel,
        msg: &ChannelMessage,
        role: &str,
    ) -> Result<(), ChannelError> {
        let handle = self.sessions.get_or_create(&user_of(msg)).await;
        let mut session = handle.lock().await;

        let answer = match self.pipeline.select_persona(&mut session, role) {
            Ok(()) => format!("✅ Role set to **{role}**. Start chatting!"),
            Err(e) => error_line(e),
        };
        channel.send(&msg.chat_id, &answer).await
    }

    async fn reply(
        &self,
        channel: &dyn Channel,
        msg: &ChannelMessage,
        text: &str,
    ) -> Result<(), ChannelError> {
        let handle = self.sessions.get_or_create(&user_of(msg)).await;
        let mut session = handle.lock().await;

        channel.send_typing(&msg.chat_id).await?;

        let answer = match self.pipeline.reply(&mut session, text).await {
            Ok(ReplyOutcome::Reply(reply)) => reply,
            Ok(ReplyOutcome::NeedsSetup { guidance }) => format!("📥 {guidance}"),
            Err(e) => {
                warn!(error = %e, "Reply failed");
                error_line(e)
            }
        };
        channel.send(&msg.chat_id, &answer).await
    }
}

fn user_of(msg: &ChannelMessage) -> UserId {
    UserId(msg.sender_id.clone())
}

fn error_line(e: impl std::fmt::Display) -> String {
    format!("⚠️ Error: {e}")
}

/// A message from the local terminal user.
fn local_message(
    channel: &CliChannel,
    content: &str,
    attachments: Vec<Attachment>,
) -> ChannelMessage {
    ChannelMessage {
        channel_id: channel.id().clone(),
        sender_id: LOCAL_USER.into(),
        content: content.into(),
        chat_id: channel.chat_id().into(),
        attachments,
    }
}

pub async fn run(
    transcript: Option<PathBuf>,
    persona: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    COHERE_API_KEY = '...'   (default provider)");
        eprintln!("    OPENAI_API_KEY = 'sk-...'");
        eprintln!("    MIMIC_API_KEY  = '...'   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let providers = router::build_from_config(&config);
    let provider = providers
        .default_provider()
        .ok_or("No default provider configured")?;
    let embedder = providers
        .default_embedder()
        .ok_or("Default provider has no embedding endpoint")?;
    let embed_model = embedder.model().to_string();
    let tokenizer = token::from_config(&config.context);
    debug!(tokenizer = tokenizer.name(), "Tokenizer ready");

    let pipeline = MimicPipeline::from_config(&config, provider, embedder, tokenizer);
    let host = ChatHost::new(
        pipeline,
        Arc::new(InMemorySessionStore::new()),
        &config.persona.platform,
    );

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          Mimic — Interactive Chat            ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.generation.model);
    println!("  Embedding: {embed_model}");
    println!();
    println!("  /upload <file.json>   load a transcript");
    println!("  /personas             list personas");
    println!("  /persona NAME         pick who to talk to");
    println!("  exit                  quit");
    println!();

    let channel = CliChannel::new();

    if let Some(path) = transcript {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let attachment = Attachment {
            filename,
            location: path.display().to_string(),
        };
        host.handle(&channel, &local_message(&channel, "", vec![attachment]))
            .await?;
    }

    if let Some(role) = persona {
        let command = format!("/persona {role}");
        host.handle(&channel, &local_message(&channel, &command, vec![]))
            .await?;
    }

    let mut rx = channel
        .start()
        .await
        .map_err(|e| format!("Channel error: {e}"))?;

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(result) = rx.recv().await {
        match result {
            Ok(msg) => {
                if let Err(e) = host.handle(&channel, &msg).await {
                    eprintln!("  [Channel Error] {e}");
                }
                println!();
                print!("  You > ");
                std::io::stdout().flush()?;
            }
            Err(e) => {
                eprintln!("  [Channel Error] {e}");
                break;
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_agent::HeuristicTokenizer;
    use mimic_core::channel::ChannelId;
    use mimic_core::error::ProviderError;
    use mimic_core::provider::{
        Embedder, EmbeddingRequest, EmbeddingResponse, GenerationRequest, GenerationResponse,
        Provider,
    };
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Records everything sent to it.
    struct RecordingChannel {
        id: ChannelId,
        sent: Mutex<Vec<String>>,
    }

    impl RecordingChannel {
        fn new() -> Self {
            Self {
                id: ChannelId("test".into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        fn last(&self) -> String {
            self.sent().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        fn id(&self) -> &ChannelId {
            &self.id
        }

        async fn start(
            &self,
        ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn send(&self, _chat_id: &str, content: &str) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    /// Replies from a script; errors once it runs dry.
    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
        call_count: Mutex<usize>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted_mock"
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            match self.replies.lock().unwrap().pop() {
                Some(reply) => Ok(GenerationResponse {
                    candidates: vec![reply],
                    model: "mock-model".into(),
                    usage: None,
                }),
                None => Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "script exhausted".into(),
                }),
            }
        }
    }

    /// Every text gets the same unit vector.
    struct ConstantEmbedder;

    #[async_trait::async_trait]
    impl Embedder for ConstantEmbedder {
        fn name(&self) -> &str {
            "constant_mock"
        }

        fn model(&self) -> &str {
            "constant-v1"
        }

        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: request.inputs.iter().map(|_| vec![1.0, 0.0]).collect(),
                model: "constant-v1".into(),
            })
        }
    }

    fn host(provider: Arc<ScriptedProvider>) -> ChatHost {
        let mut config = AppConfig::default();
        config.retry.attempts = 1;
        let pipeline = MimicPipeline::from_config(
            &config,
            provider,
            Arc::new(ConstantEmbedder),
            Arc::new(HeuristicTokenizer),
        );
        ChatHost::new(pipeline, Arc::new(InMemorySessionStore::new()), "WhatsApp")
    }

    fn text(content: &str) -> ChannelMessage {
        ChannelMessage {
            channel_id: ChannelId("test".into()),
            sender_id: "alice_friend".into(),
            content: content.into(),
            chat_id: "dm".into(),
            attachments: vec![],
        }
    }

    fn upload(path: &std::path::Path) -> ChannelMessage {
        let mut msg = text("");
        msg.attachments.push(Attachment {
            filename: path.file_name().unwrap().to_string_lossy().into_owned(),
            location: path.display().to_string(),
        });
        msg
    }

    fn write_transcript(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    const TRANSCRIPT: &str = r#"[
        {"sender": "Alice Smith", "message": "omw, 5 min 🏃‍♀️"},
        {"sender": "Bob", "message": "k"},
        {"sender": "Bob", "message": "<Media omitted>"}
    ]"#;

    #[tokio::test]
    async fn non_json_upload_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(&dir, "_chat.txt", "whatever");
        let channel = RecordingChannel::new();

        host(Arc::new(ScriptedProvider::new(&[])))
            .handle(&channel, &upload(&path))
            .await
            .unwrap();

        assert_eq!(
            channel.sent(),
            vec!["❌ Please upload a `.json` WhatsApp export file.".to_string()]
        );
    }

    #[tokio::test]
    async fn upload_select_and_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(&dir, "chat.json", TRANSCRIPT);
        let provider = Arc::new(ScriptedProvider::new(&["almost there!!"]));
        let host = host(provider.clone());
        let channel = RecordingChannel::new();

        host.handle(&channel, &upload(&path)).await.unwrap();
        assert_eq!(channel.sent()[0], PROCESSING);
        assert_eq!(
            channel.last(),
            "✅ Loaded 2 messages. Pick a persona with `/persona NAME`: Alice, Bob"
        );

        host.handle(&channel, &text("/persona Alice")).await.unwrap();
        assert_eq!(channel.last(), "✅ Role set to **Alice**. Start chatting!");

        host.handle(&channel, &text("where are you")).await.unwrap();
        assert_eq!(channel.last(), "almost there!!");
        assert_eq!(provider.calls(), 1);

        host.handle(&channel, &text("/personas")).await.unwrap();
        assert_eq!(channel.last(), "Personas: Alice, Bob");
    }

    #[tokio::test]
    async fn reply_before_setup_gives_guidance() {
        let provider = Arc::new(ScriptedProvider::new(&["unused"]));
        let channel = RecordingChannel::new();

        host(provider.clone())
            .handle(&channel, &text("hello?"))
            .await
            .unwrap();

        assert_eq!(
            channel.last(),
            "📥 Upload your WhatsApp chat JSON and pick a role first."
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn personas_before_upload_gives_guidance() {
        let channel = RecordingChannel::new();
        let host = host(Arc::new(ScriptedProvider::new(&[])));

        host.handle(&channel, &text("/personas")).await.unwrap();
        host.handle(&channel, &text("hello?")).await.unwrap();

        let sent = channel.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
        assert_eq!(sent[0], format!("📥 {}", host.pipeline.guidance()));
    }

    #[tokio::test]
    async fn empty_transcript_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(
            &dir,
            "chat.json",
            r#"[{"sender": "Bob", "message": "<Media omitted>"}, {"sender": "Bob", "message": "  "}]"#,
        );
        let channel = RecordingChannel::new();

        host(Arc::new(ScriptedProvider::new(&[])))
            .handle(&channel, &upload(&path))
            .await
            .unwrap();

        assert_eq!(channel.sent(), vec![PROCESSING.to_string(), NO_USABLE_LINES.to_string()]);
    }

    #[tokio::test]
    async fn malformed_transcript_is_an_error_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(&dir, "chat.json", r#"[{"sender": "Bob"}]"#);
        let channel = RecordingChannel::new();

        host(Arc::new(ScriptedProvider::new(&[])))
            .handle(&channel, &upload(&path))
            .await
            .unwrap();

        assert!(channel.last().starts_with("⚠️ Error: "));
    }

    #[tokio::test]
    async fn unknown_persona_is_an_error_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(&dir, "chat.json", TRANSCRIPT);
        let host = host(Arc::new(ScriptedProvider::new(&[])));
        let channel = RecordingChannel::new();

        host.handle(&channel, &upload(&path)).await.unwrap();
        host.handle(&channel, &text("/persona Carol")).await.unwrap();

        let last = channel.last();
        assert!(last.starts_with("⚠️ Error: "));
        assert!(last.contains("Carol"));
    }

    #[tokio::test]
    async fn generation_failure_is_an_error_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(&dir, "chat.json", TRANSCRIPT);
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let host = host(provider.clone());
        let channel = RecordingChannel::new();

        host.handle(&channel, &upload(&path)).await.unwrap();
        host.handle(&channel, &text("/persona Bob")).await.unwrap();
        host.handle(&channel, &text("u there?")).await.unwrap();

        assert!(channel.last().starts_with("⚠️ Error: "));
        assert!(channel.last().contains("script exhausted"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn sessions_are_per_sender() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(&dir, "chat.json", TRANSCRIPT);
        let host = host(Arc::new(ScriptedProvider::new(&[])));
        let channel = RecordingChannel::new();

        host.handle(&channel, &upload(&path)).await.unwrap();

        let mut stranger = text("/personas");
        stranger.sender_id = "someone_else".into();
        host.handle(&channel, &stranger).await.unwrap();

        assert!(channel.last().starts_with("📥 "));
    }
}
