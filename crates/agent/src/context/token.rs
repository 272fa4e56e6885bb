//! Token counting.
//!
//! The default [`HeuristicTokenizer`] uses ~4 characters per token, which
//! is within ~10% of BPE tokenizers on English chat text and needs no model
//! files. With the `hf-tokenizer` feature, [`HfTokenizer`] counts exactly
//! with a `tokenizer.json`.

use std::sync::Arc;

use mimic_config::ContextConfig;
use tracing::warn;

/// Deterministic token counter used for budget enforcement.
pub trait Tokenizer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Number of tokens in `text`. Same input, same count.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.len() + 3) / 4
}

/// The 4-characters-per-token estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Exact counts from a HuggingFace `tokenizer.json`.
#[cfg(feature = "hf-tokenizer")]
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizer")]
impl HfTokenizer {
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, mimic_core::Error> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            mimic_core::Error::Config {
                message: format!("Failed to load tokenizer {}: {e}", path.display()),
            }
        })?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "hf-tokenizer")]
impl Tokenizer for HfTokenizer {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn count_tokens(&self, text: &str) -> usize {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(_) => estimate_tokens(text),
        }
    }
}

/// Pick the tokenizer the context config asks for.
///
/// Falls back to the heuristic when no tokenizer file is configured, when
/// the file cannot be loaded, or when built without `hf-tokenizer`.
pub fn from_config(config: &ContextConfig) -> Arc<dyn Tokenizer> {
    let Some(path) = config.tokenizer_path.as_deref() else {
        return Arc::new(HeuristicTokenizer);
    };

    #[cfg(feature = "hf-tokenizer")]
    {
        match HfTokenizer::from_file(path) {
            Ok(tokenizer) => return Arc::new(tokenizer),
            Err(e) => warn!(error = %e, "Using heuristic token counts"),
        }
    }

    #[cfg(not(feature = "hf-tokenizer"))]
    warn!(
        path,
        "tokenizer_path is set but mimic was built without the hf-tokenizer feature"
    );

    Arc::new(HeuristicTokenizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn hundred_chars() {
        let text = "a".repeat(100);
        assert_eq!(HeuristicTokenizer.count_tokens(&text), 25);
    }

    #[test]
    fn counts_bytes_not_chars() {
        // Emoji are four bytes in UTF-8.
        assert_eq!(estimate_tokens("😊"), 1);
        assert_eq!(estimate_tokens("ok 😊"), 2);
    }

    #[test]
    fn default_config_uses_heuristic() {
        let tokenizer = from_config(&ContextConfig::default());
        assert_eq!(tokenizer.name(), "heuristic");
    }

    #[test]
    fn unusable_tokenizer_path_falls_back() {
        let config = ContextConfig {
            tokenizer_path: Some("/nonexistent/tokenizer.json".into()),
            ..ContextConfig::default()
        };
        assert_eq!(from_config(&config).name(), "heuristic");
    }
}
