//! Text processing modules
//!
//! - Chat prompt rendering for the emotion model
//! - BPE tokenization

mod chat;
mod tokenizer;

pub use chat::{
    classification_prompt, render_chat_prompt, ChatMessage, Role, END_OF_TEXT, IM_END, IM_START,
};
pub use tokenizer::ChatTokenizer;
