//! Chat prompt rendering for the Qwen emotion model

/// Start of a chat turn
pub const IM_START: &str = "<|im_start|>";

/// End of a chat turn
pub const IM_END: &str = "<|im_end|>";

/// End of text
pub const END_OF_TEXT: &str = "<|endoftext|>";

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Instruction
    System,
    /// Input text
    User,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone)]
pub struct ChatMessage<'a> {
    /// Speaker of the message
    pub role: Role,
    /// Message body
    pub content: &'a str,
}

/// Render messages with the Qwen3 chat template, generation prompt appended
///
/// With thinking disabled the template closes an empty think block, so the
/// answer follows immediately.
pub fn render_chat_prompt(messages: &[ChatMessage<'_>], enable_thinking: bool) -> String {
    let mut prompt = String::new();
    for message in messages {
        prompt.push_str(IM_START);
        prompt.push_str(message.role.as_str());
        prompt.push('\n');
        prompt.push_str(message.content);
        prompt.push_str(IM_END);
        prompt.push('\n');
    }
    prompt.push_str(IM_START);
    prompt.push_str("assistant\n");
    if !enable_thinking {
        prompt.push_str("<think>\n\n</think>\n\n");
    }
    prompt
}

/// Prompt pairing the classification instruction with the user text
pub fn classification_prompt(system_prompt: &str, user_text: &str) -> String {
    render_chat_prompt(
        &[
            ChatMessage {
                role: Role::System,
                content: system_prompt,
            },
            ChatMessage {
                role: Role::User,
                content: user_text,
            },
        ],
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_prompt() {
        let prompt = classification_prompt("文本情感分类", "I am thrilled");
        assert_eq!(
            prompt,
            "<|im_start|>system\n文本情感分类<|im_end|>\n\
             <|im_start|>user\nI am thrilled<|im_end|>\n\
             <|im_start|>assistant\n<think>\n\n</think>\n\n"
        );
    }

    #[test]
    fn test_thinking_enabled_leaves_block_open() {
        let prompt = render_chat_prompt(
            &[ChatMessage {
                role: Role::User,
                content: "hi",
            }],
            true,
        );
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }
}
