//! The end-to-end persona pipeline.
//!
//! 1. **Ingest** a transcript: parse, normalize, embed, then swap it into the
//!    session in one step.
//! 2. **Select** the persona to emulate.
//! 3. **Reply**: assemble context, render the prompt, generate, and record
//!    both turns in the session history.
//!
//! The pipeline itself is stateless; all per-user state lives in the
//! [`Session`] the caller passes in (and holds locked for the duration).

use std::collections::BTreeSet;
use std::sync::Arc;

use mimic_config::AppConfig;
use mimic_core::error::{Error, Result, TranscriptError};
use mimic_core::provider::{Embedder, Provider};
use mimic_core::session::Session;
use mimic_core::transcript::RawRecord;
use mimic_memory::SemanticIndex;
use tracing::{info, warn};

use crate::context::{AssemblyConfig, ContextAssembler, HistoryFormatter, Tokenizer};
use crate::generator::ReplyGenerator;
use crate::prompt::{PromptBuilder, PromptInput};

/// Outcome of a reply request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The persona's reply.
    Reply(String),
    /// No transcript or no persona yet; nothing was generated.
    NeedsSetup { guidance: String },
}

/// What a successful ingest installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    /// Records in the upload.
    pub records: usize,
    /// Canonical messages indexed.
    pub messages: usize,
    /// Personas available, sorted.
    pub roles: Vec<String>,
}

/// Transcript ingestion and persona reply generation.
pub struct MimicPipeline {
    embedder: Arc<dyn Embedder>,
    assembler: ContextAssembler,
    prompt: PromptBuilder,
    generator: ReplyGenerator,
    formatter: HistoryFormatter,
    prompt_history_window: usize,
    guidance: String,
}

impl MimicPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        assembler: ContextAssembler,
        prompt: PromptBuilder,
        generator: ReplyGenerator,
        formatter: HistoryFormatter,
        prompt_history_window: usize,
    ) -> Self {
        Self {
            embedder,
            assembler,
            prompt,
            generator,
            formatter,
            prompt_history_window,
            guidance: setup_guidance("WhatsApp"),
        }
    }

    /// Wire the pipeline from configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        embedder: Arc<dyn Embedder>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        let formatter = HistoryFormatter::from_config(&config.persona);
        let mut pipeline = Self::new(
            embedder,
            ContextAssembler::new(
                AssemblyConfig::from_config(config),
                tokenizer,
                formatter.clone(),
            ),
            PromptBuilder::from_config(&config.persona),
            ReplyGenerator::from_config(provider, config),
            formatter,
            config.context.prompt_history_window,
        );
        pipeline.guidance = setup_guidance(&config.persona.platform);
        pipeline
    }

    /// Ingest an uploaded transcript (JSON bytes) into `session`.
    pub async fn ingest(&self, session: &mut Session, bytes: &[u8]) -> Result<IngestSummary> {
        let records = mimic_transcript::parse_transcript(bytes)?;
        self.ingest_records(session, &records).await
    }

    /// Ingest already parsed records into `session`.
    ///
    /// The session is only touched once the new index is built. On any
    /// error the previous transcript, persona and history stay in place.
    pub async fn ingest_records(
        &self,
        session: &mut Session,
        records: &[RawRecord],
    ) -> Result<IngestSummary> {
        let messages = mimic_transcript::normalize(records);
        if messages.is_empty() {
            warn!(records = records.len(), "Transcript has no usable lines");
            return Err(TranscriptError::EmptyTranscript.into());
        }

        let roles: BTreeSet<String> = mimic_transcript::roles_of(&messages);
        let index = SemanticIndex::build(self.embedder.clone(), &messages).await?;

        session.replace_transcript(Arc::new(index), roles.clone());

        let summary = IngestSummary {
            records: records.len(),
            messages: messages.len(),
            roles: roles.into_iter().collect(),
        };
        info!(
            records = summary.records,
            messages = summary.messages,
            roles = summary.roles.len(),
            "Transcript ingested"
        );
        Ok(summary)
    }

    /// What to tell a user who has no transcript or persona yet.
    pub fn guidance(&self) -> &str {
        &self.guidance
    }

    /// Choose the persona to emulate.
    pub fn select_persona(&self, session: &mut Session, role: &str) -> Result<()> {
        session.select_role(role)?;
        info!(persona = role, "Persona selected");
        Ok(())
    }

    /// Reply to `user_message` as the session's active persona.
    ///
    /// The user's turn is recorded before generation, so it stays in the
    /// history even if generation fails.
    pub async fn reply(&self, session: &mut Session, user_message: &str) -> Result<ReplyOutcome> {
        let (Some(index), Some(persona)) = (session.index.clone(), session.active_role.clone())
        else {
            return Ok(ReplyOutcome::NeedsSetup {
                guidance: self.guidance.clone(),
            });
        };

        session.history.push(self.formatter.user_entry(user_message));

        let context = self
            .assembler
            .assemble(user_message, index.as_ref(), &session.history, &persona)
            .await?;

        let recent =
            self.formatter
                .rewrite_recent(&session.history, self.prompt_history_window, &persona);

        let prompt = self.prompt.render(&PromptInput {
            persona: &persona,
            context_lines: &context.lines,
            recent: &recent,
            user_message,
        });

        let reply = self
            .generator
            .generate(&prompt, &persona)
            .await
            .map_err(Error::from)?;

        session
            .history
            .push(self.formatter.persona_entry(&persona, &reply));

        Ok(ReplyOutcome::Reply(reply))
    }
}

fn setup_guidance(platform: &str) -> String {
    format!("Upload your {platform} chat JSON and pick a role first.")
}
