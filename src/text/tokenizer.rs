//! BPE Tokenization
//!
//! Wrapper around HuggingFace tokenizers for the Qwen emotion model

use anyhow::Result;
use std::path::Path;
use tokenizers::Tokenizer;

use super::chat::{END_OF_TEXT, IM_END};

/// Tokenizer of the chat model
pub struct ChatTokenizer {
    /// Underlying HuggingFace tokenizer
    tokenizer: Tokenizer,
    /// Token ids that end generation
    pub stop_token_ids: Vec<u32>,
}

impl ChatTokenizer {
    /// Load tokenizer from a `tokenizer.json` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer {:?}: {}", path.as_ref(), e))?;
        Ok(Self::from_tokenizer(tokenizer))
    }

    /// Wrap an already loaded tokenizer
    pub fn from_tokenizer(tokenizer: Tokenizer) -> Self {
        let stop_token_ids = [IM_END, END_OF_TEXT]
            .iter()
            .filter_map(|t| tokenizer.token_to_id(t))
            .collect();
        Self {
            tokenizer,
            stop_token_ids,
        }
    }

    /// Encode a rendered prompt; chat control tokens are kept as special tokens
    pub fn encode(&self, prompt: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decode ids to text, dropping special tokens
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| anyhow::anyhow!("Decoding failed: {}", e))
    }

    /// Whether `id` ends generation
    pub fn is_stop_token(&self, id: u32) -> bool {
        self.stop_token_ids.contains(&id)
    }
}
