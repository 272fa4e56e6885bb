//! Semantic search trait — the read side of a transcript index.
//!
//! The session holds an index behind this trait so the core stays free of
//! any particular vector-search implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// One ranked result from a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The original message text
    pub text: String,

    /// Sender recorded in the document metadata
    pub sender: String,

    /// Persona identifier recorded in the document metadata
    pub role: String,

    /// Cosine similarity to the query
    pub score: f32,
}

impl SearchHit {
    /// Render as a dialogue line: `"<sender>: <text>"`.
    pub fn dialogue_line(&self) -> String {
        format!("{}: {}", self.sender, self.text)
    }
}

/// Nearest-neighbour search over indexed transcript lines.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    /// Return the `k` most similar lines to `query`, most similar first.
    ///
    /// `fetch_candidates` sizes the internal candidate pool considered
    /// before the final top-`k` cut; values below `k` are treated as `k`.
    async fn search(
        &self,
        query: &str,
        k: usize,
        fetch_candidates: usize,
    ) -> std::result::Result<Vec<SearchHit>, MemoryError>;

    /// Number of indexed documents.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
