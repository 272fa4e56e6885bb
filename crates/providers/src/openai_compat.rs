//! OpenAI-compatible backend.
//!
//! Covers OpenAI, OpenRouter, Ollama and anything else that serves
//! `/chat/completions` and `/embeddings`. The rendered prompt goes out as a
//! single user message and `n` carries the candidate count.

use async_trait::async_trait;
use mimic_core::error::ProviderError;
use mimic_core::provider::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Default embedding model for OpenAI-style endpoints.
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-3-small";

/// OpenAI caps `/embeddings` at this many inputs per call.
pub const DEFAULT_EMBED_BATCH: usize = 2048;

/// Endpoints reject more stop sequences than this.
const MAX_STOP_SEQUENCES: usize = 4;

/// An OpenAI-compatible generation and embedding backend.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    embed_model: String,
    embed_batch: usize,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .user_agent(concat!("mimic/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            embed_model: DEFAULT_EMBED_MODEL.into(),
            embed_batch: DEFAULT_EMBED_BATCH,
            client,
        }
    }

    /// Use a different embedding model.
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Lower the per-call input limit for servers stricter than OpenAI.
    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch = size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completion_body(request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "n": request.candidate_count,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if !request.stop.is_empty() {
            let stop: Vec<&str> = request
                .stop
                .iter()
                .take(MAX_STOP_SEQUENCES)
                .map(String::as_str)
                .collect();
            body["stop"] = serde_json::json!(stop);
        }

        body
    }

    /// POST `body` to `path` and decode a successful reply as `T`.
    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, path, status, body = %error_body, "Provider returned error");
            return Err(status_error(status, error_body));
        }

        response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: status,
            message: format!("Unreadable {path} response: {e}"),
        })
    }
}

fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Requesting chat completion");
        let completion: Completion = self
            .post_json("chat/completions", &Self::completion_body(&request))
            .await?;
        Ok(completion.into())
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Embedder for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.embed_model
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        debug!(
            provider = %self.name,
            model = %request.model,
            texts = request.inputs.len(),
            "Requesting embeddings"
        );

        let mut merged = EmbeddingResponse {
            embeddings: Vec::with_capacity(request.inputs.len()),
            model: request.model.clone(),
        };
        for batch in request.inputs.chunks(self.embed_batch) {
            // No document/query distinction on these endpoints.
            let body = serde_json::json!({
                "model": request.model,
                "input": batch,
                "encoding_format": "float",
            });
            let rows: Embeddings = self.post_json("embeddings", &body).await?;
            let response = EmbeddingResponse::from(rows);
            if response.embeddings.len() != batch.len() {
                return Err(ProviderError::ApiError {
                    status_code: 200,
                    message: format!(
                        "Expected {} embeddings, got {}",
                        batch.len(),
                        response.embeddings.len()
                    ),
                });
            }
            merged.model = response.model;
            merged.embeddings.extend(response.embeddings);
        }
        Ok(merged)
    }
}

// Wire types.

#[derive(Debug, Deserialize)]
struct Completion {
    model: String,
    choices: Vec<Choice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<Completion> for GenerationResponse {
    fn from(c: Completion) -> Self {
        Self {
            candidates: c
                .choices
                .into_iter()
                .filter_map(|choice| choice.message.content)
                .collect(),
            model: c.model,
            usage: c.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Embeddings {
    data: Vec<EmbeddingRow>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl From<Embeddings> for EmbeddingResponse {
    /// Vectors come back in input order whatever order the rows were listed in.
    fn from(mut e: Embeddings) -> Self {
        e.data.sort_by_key(|row| row.index);
        Self {
            embeddings: e.data.into_iter().map(|row| row.embedding).collect(),
            model: e.model,
        }
    }
}
