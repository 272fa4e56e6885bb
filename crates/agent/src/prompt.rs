//! Prompt rendering.
//!
//! The prompt is a pure function of its inputs: an instruction naming the
//! persona, three fixed example exchanges, the assembled context lines, the
//! last few turns of this conversation, and the new message with a trailing
//! persona cue for the model to complete.

use mimic_config::PersonaConfig;

/// Shown in place of the recent-conversation block when there is none.
pub const NO_RECENT_CONVERSATION: &str = "No recent conversation.";

/// Everything one prompt is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    /// Persona being emulated.
    pub persona: &'a str,
    /// Assembled context lines, oldest to newest.
    pub context_lines: &'a [String],
    /// Short rewritten history window, oldest to newest.
    pub recent: &'a [String],
    /// The message being replied to.
    pub user_message: &'a str,
}

/// Renders generation prompts.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    platform: String,
    user_label: String,
}

impl PromptBuilder {
    pub fn new(platform: impl Into<String>, user_label: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            user_label: user_label.into(),
        }
    }

    pub fn from_config(config: &PersonaConfig) -> Self {
        Self::new(&config.platform, &config.user_label)
    }

    /// Render the prompt. Same input, byte-identical output.
    pub fn render(&self, input: &PromptInput<'_>) -> String {
        let persona = input.persona;
        let user = &self.user_label;

        let recent = if input.recent.is_empty() {
            NO_RECENT_CONVERSATION.to_string()
        } else {
            input.recent.join("\n")
        };

        let prompt = format!(
            r#"
You are "{persona}", replying on {platform}. Match the style, wording, emojis, punctuation, and length of the chat excerpts below.
Be concise and natural.

Examples:
{user}: Hey, how's it going? 😊
{persona}: I'm good, thanks! You?

{user}: When is the meeting?
{persona}: Around 3pm, don't be late!

{user}: Can you send me the report?
{persona}: Sure thing, I'll send it shortly.

Chat excerpts:
{context}

Recent conversation:
{recent}

User: {message}
{persona}:
"#,
            platform = self.platform,
            context = input.context_lines.join("\n"),
            message = input.user_message,
        );

        prompt.trim().to_string()
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_config(&PersonaConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn renders_all_sections_in_order() {
        let context = lines(&["Alice Smith: running late 🙈", "You: np"]);
        let recent = lines(&["You: np"]);
        let prompt = PromptBuilder::default().render(&PromptInput {
            persona: "Alice",
            context_lines: &context,
            recent: &recent,
            user_message: "where are you?",
        });

        assert!(prompt.starts_with(r#"You are "Alice", replying on WhatsApp."#));
        assert!(prompt.ends_with("User: where are you?\nAlice:"));

        let examples = prompt.find("Examples:\nYou: Hey, how's it going? 😊\nAlice: I'm good").unwrap();
        let excerpts = prompt
            .find("Chat excerpts:\nAlice Smith: running late 🙈\nYou: np\n\n")
            .unwrap();
        let conversation = prompt.find("Recent conversation:\nYou: np\n\n").unwrap();
        assert!(examples < excerpts && excerpts < conversation);
    }

    #[test]
    fn empty_history_uses_sentinel() {
        let prompt = PromptBuilder::default().render(&PromptInput {
            persona: "Bob",
            context_lines: &[],
            recent: &[],
            user_message: "hi",
        });
        assert!(prompt.contains("Recent conversation:\nNo recent conversation.\n"));
    }

    #[test]
    fn rendering_is_pure() {
        let context = lines(&["Bob: ok", "Bob: sure"]);
        let recent = lines(&["You: hey", "Bob: yo"]);
        let input = PromptInput {
            persona: "Bob",
            context_lines: &context,
            recent: &recent,
            user_message: "u up?",
        };
        let builder = PromptBuilder::default();
        assert_eq!(builder.render(&input), builder.render(&input));
        assert_eq!(builder.render(&input), PromptBuilder::default().render(&input));
    }

    #[test]
    fn labels_come_from_config() {
        let builder = PromptBuilder::new("Telegram", "Me");
        let prompt = builder.render(&PromptInput {
            persona: "Carol",
            context_lines: &[],
            recent: &[],
            user_message: "hey",
        });
        assert!(prompt.contains("replying on Telegram."));
        assert!(prompt.contains("Me: When is the meeting?\nCarol: Around 3pm"));
        // The new message is always introduced as "User:".
        assert!(prompt.contains("\nUser: hey\nCarol:"));
    }

    #[test]
    fn no_surrounding_whitespace() {
        let prompt = PromptBuilder::default().render(&PromptInput {
            persona: "Bob",
            context_lines: &[],
            recent: &[],
            user_message: "  spaced  ",
        });
        assert_eq!(prompt, prompt.trim());
    }
}
