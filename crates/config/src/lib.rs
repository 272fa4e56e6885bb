//! Configuration loading, validation, and management for Mimic.
//!
//! Loads configuration from `~/.mimic/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.mimic/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Backend used for both generation and embeddings
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// How the user and the emulated chat are labelled
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Similarity search settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Context window and token budget
    #[serde(default)]
    pub context: ContextConfig,

    /// Completion settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Embedding settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retry policy for the generation call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "cohere".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("persona", &self.persona)
            .field("retrieval", &self.retrieval)
            .field("context", &self.context)
            .field("generation", &self.generation)
            .field("embedding", &self.embedding)
            .field("retry", &self.retry)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Speaker label stored in history for the user's own lines
    #[serde(default = "default_user_label")]
    pub user_label: String,

    /// Name the user's lines are rendered with in the prompt
    #[serde(default = "default_user_label")]
    pub user_display_name: String,

    /// Chat platform named in the prompt instruction
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_user_label() -> String {
    "You".into()
}
fn default_platform() -> String {
    "WhatsApp".into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            user_label: default_user_label(),
            user_display_name: default_user_label(),
            platform: default_platform(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Similar lines retrieved per reply
    #[serde(default = "default_retrieval_k")]
    pub k: usize,

    /// Candidate pool considered before the final top-k cut
    #[serde(default = "default_retrieval_fetch")]
    pub fetch: usize,
}

fn default_retrieval_k() -> usize {
    8
}
fn default_retrieval_fetch() -> usize {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_retrieval_k(),
            fetch: default_retrieval_fetch(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// History entries mixed into the retrieved context
    #[serde(default = "default_recent_history_window")]
    pub recent_history_window: usize,

    /// History entries shown in the prompt's "recent conversation" block
    #[serde(default = "default_prompt_history_window")]
    pub prompt_history_window: usize,

    /// Token budget for the assembled context lines
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Path to a `tokenizer.json` (used with the `hf-tokenizer` feature)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<String>,
}

fn default_recent_history_window() -> usize {
    6
}
fn default_prompt_history_window() -> usize {
    3
}
fn default_token_budget() -> usize {
    1800
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            recent_history_window: default_recent_history_window(),
            prompt_history_window: default_prompt_history_window(),
            token_budget: default_token_budget(),
            tokenizer_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-k sampling cutoff (ignored by backends without one)
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

fn default_generation_model() -> String {
    "command-r-plus".into()
}
fn default_max_tokens() -> u32 {
    120
}
fn default_temperature() -> f32 {
    0.5
}
fn default_top_k() -> u32 {
    1
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model override; unset means the backend's own default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Seconds to wait between attempts
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Double the delay after every failed attempt
    #[serde(default)]
    pub exponential: bool,
}

fn default_attempts() -> u32 {
    3
}
fn default_delay_secs() -> u64 {
    4
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_secs: default_delay_secs(),
            exponential: false,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.mimic/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `MIMIC_API_KEY` (highest priority)
    /// - `COHERE_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("MIMIC_API_KEY")
                .or_else(|| lookup("COHERE_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("MIMIC_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("MIMIC_MODEL") {
            self.generation.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mimic")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.temperature < 0.0 || self.generation.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.k must be at least 1".into(),
            ));
        }

        if self.retrieval.fetch < self.retrieval.k {
            return Err(ConfigError::ValidationError(format!(
                "retrieval.fetch ({}) must be >= retrieval.k ({})",
                self.retrieval.fetch, self.retrieval.k
            )));
        }

        if self.context.token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "context.token_budget must be > 0".into(),
            ));
        }

        if self.retry.attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.attempts must be at least 1".into(),
            ));
        }

        if self.persona.user_label.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "persona.user_label must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// API key for a provider: its own entry first, then the global key.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key_for(&self.default_provider).is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            persona: PersonaConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            generation: GenerationConfig::default(),
            embedding: EmbeddingConfig::default(),
            retry: RetryConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
