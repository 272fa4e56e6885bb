//! Shared test helpers for pipeline tests.

use mimic_core::error::ProviderError;
use mimic_core::provider::{
    Embedder, EmbeddingRequest, EmbeddingResponse, GenerationRequest, GenerationResponse,
    Provider, Usage,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock provider that plays back a script of outcomes.
///
/// Each call to `generate` pops the next entry: `Ok(candidates)` or an
/// error. Panics if more calls are made than entries provided.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Vec<String>, ProviderError>>>,
    call_count: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Vec<String>, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            call_count: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// One successful single-candidate reply per entry.
    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(vec![t.to_string()])).collect())
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        self.prompts.lock().unwrap().push(request.prompt);

        let next = self.script.lock().unwrap().pop_front();
        let candidates = next.unwrap_or_else(|| {
            panic!(
                "ScriptedProvider: no more responses (call #{})",
                self.call_count()
            )
        })?;

        Ok(GenerationResponse {
            candidates,
            model: "mock-model".into(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}

/// Embeds text as keyword counts over a small vocabulary, so similar
/// lines really are closer.
pub struct KeywordEmbedder {
    call_count: Mutex<usize>,
}

const VOCAB: [&str; 6] = ["coffee", "meeting", "report", "dog", "pizza", "late"];

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            call_count: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = VOCAB.iter().map(|w| lower.matches(w).count() as f32).collect();
        v.push(0.01);
        v
    }
}

#[async_trait::async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword_mock"
    }

    fn model(&self) -> &str {
        "keyword-v1"
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| Self::vector(t)).collect(),
            model: "keyword-v1".into(),
        })
    }
}

/// An embedder whose every call fails.
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing_mock"
    }

    fn model(&self) -> &str {
        "none"
    }

    async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::ApiError {
            status_code: 503,
            message: "embedding service unavailable".into(),
        })
    }
}
