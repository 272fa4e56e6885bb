//! Reply generation with bounded retry.

use std::sync::Arc;

use mimic_config::AppConfig;
use mimic_core::error::ProviderError;
use mimic_core::provider::{GenerationRequest, Provider};
use mimic_providers::RetryPolicy;
use tracing::{debug, info};

/// Sampling settings for one reply.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_k: Option<u32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "command-r-plus".into(),
            max_tokens: 120,
            temperature: 0.5,
            top_k: Some(1),
        }
    }
}

/// Calls the generation backend and extracts a single reply.
pub struct ReplyGenerator {
    provider: Arc<dyn Provider>,
    settings: GenerationSettings,
    retry: RetryPolicy,
    user_label: String,
}

impl ReplyGenerator {
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: GenerationSettings,
        retry: RetryPolicy,
        user_label: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            settings,
            retry,
            user_label: user_label.into(),
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(
            provider,
            GenerationSettings {
                model: config.generation.model.clone(),
                max_tokens: config.generation.max_tokens,
                temperature: config.generation.temperature,
                top_k: Some(config.generation.top_k),
            },
            RetryPolicy::from_config(&config.retry),
            &config.persona.user_label,
        )
    }

    /// Build the request for `prompt`, stopping before either speaker's
    /// next turn.
    pub fn request_for(&self, prompt: &str, persona: &str) -> GenerationRequest {
        GenerationRequest {
            model: self.settings.model.clone(),
            prompt: prompt.to_string(),
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.max_tokens),
            stop: vec![format!("\n{}:", self.user_label), format!("\n{persona}:")],
            candidate_count: 1,
            top_k: self.settings.top_k,
        }
    }

    /// Generate a reply as `persona`.
    ///
    /// Service errors and empty responses are retried per the policy; the
    /// last error propagates once attempts run out.
    pub async fn generate(&self, prompt: &str, persona: &str) -> Result<String, ProviderError> {
        let request = self.request_for(prompt, persona);

        let reply = self
            .retry
            .run(|attempt| {
                let provider = self.provider.clone();
                let request = request.clone();
                async move {
                    debug!(
                        provider = %provider.name(),
                        model = %request.model,
                        attempt,
                        "Requesting reply"
                    );
                    let response = provider.generate(request).await?;
                    response
                        .first()
                        .map(|text| text.trim().to_string())
                        .ok_or(ProviderError::EmptyResponse)
                }
            })
            .await?;

        info!(persona, chars = reply.len(), "Reply generated");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use std::time::Duration;

    fn generator(provider: Arc<ScriptedProvider>) -> ReplyGenerator {
        ReplyGenerator::new(
            provider,
            GenerationSettings::default(),
            RetryPolicy::new(3, Duration::from_secs(4)),
            "You",
        )
    }

    #[test]
    fn request_matches_reply_settings() {
        let provider = Arc::new(ScriptedProvider::replies(&[]));
        let request = generator(provider).request_for("prompt", "Alice");
        assert_eq!(request.max_tokens, Some(120));
        assert!((request.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(request.candidate_count, 1);
        assert_eq!(request.stop, vec!["\nYou:".to_string(), "\nAlice:".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn first_candidate_is_trimmed() {
        let provider = Arc::new(ScriptedProvider::replies(&["  haha sure 😂 \n"]));
        let reply = generator(provider.clone()).generate("p", "Alice").await.unwrap();
        assert_eq!(reply, "haha sure 😂");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.prompts(), vec!["p".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Network("reset".into())),
            Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            }),
            Ok(vec!["finally".into()]),
        ]));
        let reply = generator(provider.clone()).generate("p", "Bob").await.unwrap();
        assert_eq!(reply, "finally");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_attempts() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Network("one".into())),
            Err(ProviderError::Network("two".into())),
            Err(ProviderError::Network("three".into())),
            Ok(vec!["never reached".into()]),
        ]));
        let err = generator(provider.clone()).generate("p", "Bob").await.unwrap_err();
        assert_eq!(provider.call_count(), 3);
        assert!(err.to_string().contains("three"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_response_is_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(vec![]),
            Ok(vec!["second time".into()]),
        ]));
        let reply = generator(provider.clone()).generate("p", "Bob").await.unwrap();
        assert_eq!(reply, "second time");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_empty_response_is_an_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(vec![]), Ok(vec![]), Ok(vec![])]));
        let err = generator(provider).generate("p", "Bob").await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }
}
