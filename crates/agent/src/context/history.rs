//! Conversation history entries and their prompt rendering.
//!
//! History is stored as `"<speaker>: <text>"` strings, where the speaker is
//! either the fixed user label or the active persona. Before entering a
//! prompt, recent entries are re-rendered so the user side shows the
//! configured display name.

use mimic_config::PersonaConfig;

/// Formats and rewrites history entries.
#[derive(Debug, Clone)]
pub struct HistoryFormatter {
    user_label: String,
    user_display_name: String,
}

impl HistoryFormatter {
    pub fn new(user_label: impl Into<String>, user_display_name: impl Into<String>) -> Self {
        Self {
            user_label: user_label.into(),
            user_display_name: user_display_name.into(),
        }
    }

    pub fn from_config(config: &PersonaConfig) -> Self {
        Self::new(&config.user_label, &config.user_display_name)
    }

    /// The label user entries are stored under (e.g. `You`).
    pub fn user_label(&self) -> &str {
        &self.user_label
    }

    /// History entry for something the user said.
    pub fn user_entry(&self, text: &str) -> String {
        format!("{}: {text}", self.user_label)
    }

    /// History entry for a generated persona reply.
    pub fn persona_entry(&self, persona: &str, text: &str) -> String {
        format!("{persona}: {text}")
    }

    /// Rewrite the last `window` entries for prompt use, oldest first.
    ///
    /// User entries get the display name, persona entries the persona name.
    /// The text after a matched label is trimmed. Anything else passes
    /// through unchanged.
    pub fn rewrite_recent(&self, history: &[String], window: usize, persona: &str) -> Vec<String> {
        let start = history.len().saturating_sub(window);
        let user_prefix = format!("{}:", self.user_label);
        let persona_prefix = format!("{persona}:");

        history[start..]
            .iter()
            .map(|entry| {
                if let Some(rest) = entry.strip_prefix(&user_prefix) {
                    format!("{}: {}", self.user_display_name, rest.trim())
                } else if let Some(rest) = entry.strip_prefix(&persona_prefix) {
                    format!("{persona}: {}", rest.trim())
                } else {
                    entry.clone()
                }
            })
            .collect()
    }
}

impl Default for HistoryFormatter {
    fn default() -> Self {
        Self::from_config(&PersonaConfig::default())
    }
}
