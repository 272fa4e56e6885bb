//! Provider traits — the abstraction over text-generation and embedding
//! backends.
//!
//! A [`Provider`] turns a rendered prompt into one or more completion
//! candidates. An [`Embedder`] turns a batch of texts into fixed-length
//! vectors. Most hosted backends (Cohere, OpenAI-compatible endpoints)
//! implement both.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A single-prompt completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g., "command-r-plus", "gpt-4o-mini")
    pub model: String,

    /// The fully rendered prompt
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    /// How many candidates to request
    #[serde(default = "default_candidate_count")]
    pub candidate_count: u32,

    /// Top-k sampling cutoff, for backends that support it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

fn default_temperature() -> f32 {
    0.5
}

fn default_candidate_count() -> u32 {
    1
}

/// A completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Candidate completions, in the order the backend returned them.
    pub candidates: Vec<String>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl GenerationResponse {
    /// The first candidate, if any.
    pub fn first(&self) -> Option<&str> {
        self.candidates.first().map(String::as_str)
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// What the embedded texts will be used for.
///
/// Some backends (Cohere v3) embed stored documents and search queries
/// into slightly different spaces; others ignore the distinction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingPurpose {
    /// Texts stored in the index
    #[default]
    Document,
    /// A query issued against the index
    Query,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "embed-english-v3.0").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,

    /// Document or query embedding.
    #[serde(default)]
    pub purpose: EmbeddingPurpose,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,
}

/// The text-generation trait.
///
/// The reply generator calls `generate()` without knowing which backend is
/// being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "cohere", "openai").
    fn name(&self) -> &str;

    /// Send a prompt and get back the completion candidates.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// The batched embedding trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name for this embedder.
    fn name(&self) -> &str;

    /// The embedding model requests should name.
    fn model(&self) -> &str;

    /// Generate one vector per input text.
    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError>;
}
