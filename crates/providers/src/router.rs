//! Provider router — selects generation and embedding backends from config.
//!
//! Every hosted backend serves both roles, so a registered backend is
//! reachable as a [`Provider`] and as an [`Embedder`] under the same name.

use std::collections::HashMap;
use std::sync::Arc;

use mimic_config::AppConfig;
use mimic_core::provider::{Embedder, Provider};
use tracing::debug;

use crate::cohere::CohereProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes generation and embedding calls to the configured backend.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    embedders: HashMap<String, Arc<dyn Embedder>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default backend name.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            embedders: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a backend that both generates and embeds.
    pub fn register<B>(&mut self, name: impl Into<String>, backend: Arc<B>)
    where
        B: Provider + Embedder + 'static,
    {
        let name = name.into();
        self.providers.insert(name.clone(), backend.clone());
        self.embedders.insert(name, backend);
    }

    /// The default generation backend.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// The default embedding backend.
    pub fn default_embedder(&self) -> Option<Arc<dyn Embedder>> {
        self.embedders.get(&self.default_provider).cloned()
    }

    /// Get a specific generation backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Get a specific embedding backend by name.
    pub fn get_embedder(&self, name: &str) -> Option<Arc<dyn Embedder>> {
        self.embedders.get(name).cloned()
    }

    pub fn default_name(&self) -> &str {
        &self.default_provider
    }

    /// List all registered generation backends, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build backends from configuration.
///
/// Every `[providers.<name>]` entry is registered, and the default provider
/// is registered even when it has no explicit entry.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    let mut names: Vec<&String> = config.providers.keys().collect();
    if !config.providers.contains_key(&config.default_provider) {
        names.push(&config.default_provider);
    }

    for name in names {
        let api_key = config.api_key_for(name).unwrap_or_default();
        let api_url = config
            .providers
            .get(name)
            .and_then(|p| p.api_url.clone());

        if name == "cohere" {
            let mut provider = CohereProvider::new(&api_key);
            if let Some(model) = &config.embedding.model {
                provider = provider.with_embed_model(model);
            }
            if let Some(url) = api_url {
                provider = provider.with_base_url(url);
            }
            router.register(name.clone(), Arc::new(provider));
        } else {
            let base_url = api_url.unwrap_or_else(|| default_base_url(name));
            let mut provider = OpenAiCompatProvider::new(name, &base_url, &api_key);
            if let Some(model) = &config.embedding.model {
                provider = provider.with_embed_model(model);
            }
            router.register(name.clone(), Arc::new(provider));
        }

        debug!(provider = %name, "Registered provider");
    }

    router
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "cohere" => crate::cohere::COHERE_BASE_URL.into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
