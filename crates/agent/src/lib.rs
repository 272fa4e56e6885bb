//! The persona reply pipeline.
//!
//! For every incoming message the pipeline:
//!
//! 1. **Retrieves** transcript lines similar to the message
//! 2. **Merges** them with the recent conversation and trims to a token budget
//! 3. **Renders** a prompt with style examples and a persona cue
//! 4. **Generates** one reply, retrying transient backend failures
//! 5. **Records** both turns in the session history
//!
//! Transcript ingestion (parse → normalize → index → swap into the session)
//! lives here too, so a host only needs a [`MimicPipeline`] and a session
//! store.

pub mod context;
pub mod generator;
pub mod pipeline;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use context::{
    AssembledContext, AssemblyConfig, AssemblyMetadata, ContextAssembler, HeuristicTokenizer,
    HistoryFormatter, Tokenizer,
};
pub use generator::{GenerationSettings, ReplyGenerator};
pub use pipeline::{IngestSummary, MimicPipeline, ReplyOutcome};
pub use prompt::{NO_RECENT_CONVERSATION, PromptBuilder, PromptInput};
