//! Model configuration
//!
//! Reads the subset of the IndexTTS2 `config.yaml` that emotion resolution
//! needs. Keys owned by the synthesis engine are ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::emotion::DEFAULT_SYSTEM_PROMPT;

/// Token id of `</think>` in the Qwen3 vocabulary
pub const DEFAULT_ANSWER_MARKER_TOKEN_ID: u32 = 151668;

fn default_qwen_emo_path() -> String {
    "qwen0.6bemo4-merge/".to_string()
}

fn default_emo_num() -> Vec<usize> {
    vec![3, 17, 2, 8, 4, 5, 10, 24]
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_answer_marker() -> u32 {
    DEFAULT_ANSWER_MARKER_TOKEN_ID
}

fn default_max_new_tokens() -> usize {
    512
}

fn default_seed() -> u64 {
    299792458
}

/// When text classification runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMode {
    /// Flag the directive and let the synthesis side classify
    #[default]
    Lazy,
    /// Classify while resolving
    Eager,
}

/// Settings of the text emotion classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionConfig {
    /// System instruction paired with the user text
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Token after which the model's final answer starts
    #[serde(default = "default_answer_marker")]
    pub answer_marker_token_id: u32,
    /// Generation length cap
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,
    /// Optional wall-clock budget for one classification
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    /// Seed for the logits processor
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Eager or lazy text classification
    #[serde(default)]
    pub mode: ClassificationMode,
}

impl EmotionConfig {
    /// Generation deadline as a duration
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            answer_marker_token_id: default_answer_marker(),
            max_new_tokens: default_max_new_tokens(),
            deadline_ms: None,
            seed: default_seed(),
            mode: ClassificationMode::default(),
        }
    }
}

/// Model configuration relevant to emotion resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Qwen emotion model directory, relative to the checkpoint directory
    #[serde(default = "default_qwen_emo_path")]
    pub qwen_emo_path: String,
    /// Number of emotion matrix rows per label
    #[serde(default = "default_emo_num")]
    pub emo_num: Vec<usize>,
    /// Checkpoint version
    #[serde(default)]
    pub version: Option<f32>,
    /// Classifier settings
    #[serde(default)]
    pub emotion: EmotionConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            qwen_emo_path: default_qwen_emo_path(),
            emo_num: default_emo_num(),
            version: None,
            emotion: EmotionConfig::default(),
        }
    }
}

impl ModelConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: ModelConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Absolute path of the Qwen emotion model
    pub fn qwen_emo_dir<P: AsRef<Path>>(&self, model_dir: P) -> PathBuf {
        model_dir.as_ref().join(&self.qwen_emo_path)
    }
}
