//! Cohere provider implementation.
//!
//! Uses the v1 `generate` endpoint for single-prompt completion and the v1
//! `embed` endpoint for batched embeddings. Document and query embeddings
//! are requested with distinct `input_type`s, as the v3 embedding models
//! expect.

use async_trait::async_trait;
use mimic_core::error::ProviderError;
use mimic_core::provider::*;
use serde::Deserialize;
use tracing::{debug, warn};

/// Default API root.
pub const COHERE_BASE_URL: &str = "https://api.cohere.com/v1";

/// Default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = "embed-english-v3.0";

/// The embed endpoint accepts at most this many texts per call.
pub const MAX_EMBED_BATCH: usize = 96;

/// A Cohere text-generation and embedding backend.
pub struct CohereProvider {
    base_url: String,
    api_key: String,
    embed_model: String,
    client: reqwest::Client,
}

impl CohereProvider {
    /// Create a provider against the public Cohere API.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .user_agent(concat!("mimic/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: COHERE_BASE_URL.into(),
            api_key: api_key.into(),
            embed_model: DEFAULT_EMBED_MODEL.into(),
            client,
        }
    }

    /// Point the provider at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different embedding model.
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_body(request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "temperature": request.temperature,
            "num_generations": request.candidate_count,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(k) = request.top_k {
            body["k"] = serde_json::json!(k);
        }
        if !request.stop.is_empty() {
            body["stop_sequences"] = serde_json::json!(request.stop);
        }

        body
    }

    fn input_type(purpose: EmbeddingPurpose) -> &'static str {
        match purpose {
            EmbeddingPurpose::Document => "search_document",
            EmbeddingPurpose::Query => "search_query",
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
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
        match status {
            200 => Ok(response),
            429 => Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            }),
            401 | 403 => Err(ProviderError::AuthenticationFailed(
                "Invalid Cohere API key or insufficient permissions".into(),
            )),
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                warn!(provider = "cohere", status, body = %error_body, "Provider returned error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message: error_body,
                })
            }
        }
    }
}

#[async_trait]
impl Provider for CohereProvider {
    fn name(&self) -> &str {
        "cohere"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError> {
        debug!(provider = "cohere", model = %request.model, "Sending generate request");

        let response = self.post("generate", &Self::generate_body(&request)).await?;
        let api: GenerateApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Ok(api.into_response(request.model))
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Embedder for CohereProvider {
    fn name(&self) -> &str {
        "cohere"
    }

    fn model(&self) -> &str {
        &self.embed_model
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        debug!(
            provider = "cohere",
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let mut embeddings = Vec::with_capacity(request.inputs.len());
        for batch in request.inputs.chunks(MAX_EMBED_BATCH) {
            let body = serde_json::json!({
                "model": request.model,
                "texts": batch,
                "input_type": Self::input_type(request.purpose),
                "truncate": "END",
            });

            let response = self.post("embed", &body).await?;
            let api: EmbedApiResponse =
                response.json().await.map_err(|e| ProviderError::ApiError {
                    status_code: 200,
                    message: format!("Failed to parse embedding response: {e}"),
                })?;
            if api.embeddings.len() != batch.len() {
                return Err(ProviderError::ApiError {
                    status_code: 200,
                    message: format!(
                        "Expected {} embeddings, got {}",
                        batch.len(),
                        api.embeddings.len()
                    ),
                });
            }
            embeddings.extend(api.embeddings);
        }

        Ok(EmbeddingResponse {
            embeddings,
            model: request.model,
        })
    }
}

// --- Cohere API types (internal) ---

#[derive(Debug, Deserialize)]
struct GenerateApiResponse {
    #[serde(default)]
    generations: Vec<ApiGeneration>,
    #[serde(default)]
    meta: Option<ApiMeta>,
}

impl GenerateApiResponse {
    fn into_response(self, model: String) -> GenerationResponse {
        let usage = self
            .meta
            .and_then(|m| m.billed_units)
            .map(|b| Usage {
                prompt_tokens: b.input_tokens,
                completion_tokens: b.output_tokens,
                total_tokens: b.input_tokens + b.output_tokens,
            });

        GenerationResponse {
            candidates: self.generations.into_iter().map(|g| g.text).collect(),
            model,
            usage,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiGeneration {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiMeta {
    #[serde(default)]
    billed_units: Option<ApiBilledUnits>,
}

#[derive(Debug, Deserialize)]
struct ApiBilledUnits {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbedApiResponse {
    embeddings: Vec<Vec<f32>>,
}
