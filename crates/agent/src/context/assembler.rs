//! Context assembly — retrieved transcript lines plus recent history,
//! trimmed to a token budget.
//!
//! 1. **Retrieval**: the `k` transcript lines most similar to the new
//!    message, most similar first, as `"<sender>: <text>"`.
//! 2. **Recent history**: the last few conversation entries, rewritten for
//!    prompt use, oldest first.
//!
//! The concatenation is trimmed from the end backwards: the newest lines are
//! kept and the walk stops at the first line that would overflow. The
//! result is the longest suffix that fits; a line is never cut.
//!
//! # Determinism
//!
//! Given the same retrieval hits, history and tokenizer, assembly always
//! produces the same lines.

use std::sync::Arc;

use mimic_config::AppConfig;
use mimic_core::error::MemoryError;
use mimic_core::index::SemanticSearch;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::history::HistoryFormatter;
use crate::context::token::{HeuristicTokenizer, Tokenizer};

// ── Types ─────────────────────────────────────────────────────────────────

/// Retrieval and budget settings.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Transcript lines to retrieve.
    pub retrieval_k: usize,
    /// Candidate pool considered before keeping the top `retrieval_k`.
    pub retrieval_fetch: usize,
    /// History entries to include.
    pub recent_history_window: usize,
    /// Upper bound on the tokens of all context lines together.
    pub token_budget: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            retrieval_k: 8,
            retrieval_fetch: 10,
            recent_history_window: 6,
            token_budget: 1800,
        }
    }
}

impl AssemblyConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retrieval_k: config.retrieval.k,
            retrieval_fetch: config.retrieval.fetch,
            recent_history_window: config.context.recent_history_window,
            token_budget: config.context.token_budget,
        }
    }
}

/// Context lines ready for the prompt, oldest to newest.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub lines: Vec<String>,
    pub metadata: AssemblyMetadata,
}

/// What happened during assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Lines returned by retrieval.
    pub retrieved: usize,
    /// History lines considered.
    pub recent: usize,
    /// Tokens in the kept lines.
    pub total_tokens: usize,
    /// Configured budget.
    pub budget: usize,
    /// Lines left out to respect the budget.
    pub lines_dropped: usize,
    /// Tokens of the left-out lines.
    pub tokens_dropped: usize,
}

/// Result of [`trim_to_budget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedLines {
    pub lines: Vec<String>,
    pub tokens_used: usize,
    pub lines_dropped: usize,
    pub tokens_dropped: usize,
}

/// Keep the longest suffix of `lines` whose token total fits `budget`.
///
/// Walks from the newest line backwards and stops at the first line that
/// would overflow; everything older than it is dropped too. Order is
/// preserved.
pub fn trim_to_budget(lines: Vec<String>, budget: usize, tokenizer: &dyn Tokenizer) -> TrimmedLines {
    let counts: Vec<usize> = lines.iter().map(|l| tokenizer.count_tokens(l)).collect();

    // Sliding window: include from newest (end) → oldest.
    let mut used = 0;
    let mut first_kept = lines.len();
    for (i, &line_tokens) in counts.iter().enumerate().rev() {
        if used + line_tokens > budget {
            break;
        }
        used += line_tokens;
        first_kept = i;
    }

    let mut lines = lines;
    let kept = lines.split_off(first_kept);
    TrimmedLines {
        lines: kept,
        tokens_used: used,
        lines_dropped: first_kept,
        tokens_dropped: counts[..first_kept].iter().sum(),
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless; create one and reuse it.
pub struct ContextAssembler {
    config: AssemblyConfig,
    tokenizer: Arc<dyn Tokenizer>,
    formatter: HistoryFormatter,
}

impl ContextAssembler {
    pub fn new(
        config: AssemblyConfig,
        tokenizer: Arc<dyn Tokenizer>,
        formatter: HistoryFormatter,
    ) -> Self {
        Self {
            config,
            tokenizer,
            formatter,
        }
    }

    /// Default settings with the heuristic tokenizer.
    pub fn with_defaults() -> Self {
        Self::new(
            AssemblyConfig::default(),
            Arc::new(HeuristicTokenizer),
            HistoryFormatter::default(),
        )
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Retrieve, merge and trim context for one reply.
    ///
    /// Retrieval failures (the query embedding call) propagate.
    pub async fn assemble(
        &self,
        user_message: &str,
        index: &dyn SemanticSearch,
        history: &[String],
        persona: &str,
    ) -> Result<AssembledContext, MemoryError> {
        let hits = index
            .search(
                user_message,
                self.config.retrieval_k,
                self.config.retrieval_fetch,
            )
            .await?;
        let retrieved = hits.len();

        let recent =
            self.formatter
                .rewrite_recent(history, self.config.recent_history_window, persona);
        let recent_count = recent.len();

        let mut lines: Vec<String> = hits.iter().map(|h| h.dialogue_line()).collect();
        lines.extend(recent);

        Ok(self.finish(lines, retrieved, recent_count))
    }

    /// Trim already gathered lines and attach metadata.
    fn finish(&self, lines: Vec<String>, retrieved: usize, recent: usize) -> AssembledContext {
        let trimmed = trim_to_budget(lines, self.config.token_budget, self.tokenizer.as_ref());

        let metadata = AssemblyMetadata {
            retrieved,
            recent,
            total_tokens: trimmed.tokens_used,
            budget: self.config.token_budget,
            lines_dropped: trimmed.lines_dropped,
            tokens_dropped: trimmed.tokens_dropped,
        };

        debug!(
            tokenizer = %self.tokenizer.name(),
            retrieved,
            recent,
            tokens = metadata.total_tokens,
            budget = metadata.budget,
            dropped = metadata.lines_dropped,
            "Context assembled"
        );

        AssembledContext {
            lines: trimmed.lines,
            metadata,
        }
    }
}
