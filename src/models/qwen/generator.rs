//! Greedy text generation with a local Qwen3 checkpoint
//!
//! Implements the generation loop with:
//! - Qwen3 chat prompt, thinking disabled
//! - KV-cached incremental decoding
//! - Stop token detection and a length cap
//! - Optional wall-clock deadline
//! - Answer extraction after the last `</think>` marker

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::qwen3::{Config as Qwen3Config, ModelForCausalLM};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::EmotionConfig;
use crate::models::emotion::TextGenerator;
use crate::text::{classification_prompt, ChatTokenizer};

/// Generation configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Maximum number of new tokens
    pub max_new_tokens: usize,
    /// Token after which the final answer starts
    pub answer_marker_token_id: u32,
    /// Abort generation after this long
    pub deadline: Option<Duration>,
    /// Logits processor seed
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        EmotionConfig::default().into()
    }
}

impl From<EmotionConfig> for GenerationConfig {
    fn from(config: EmotionConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            answer_marker_token_id: config.answer_marker_token_id,
            deadline: config.deadline(),
            seed: config.seed,
        }
    }
}

/// Per-step limits of one generation: length cap and wall-clock deadline
#[derive(Debug, Clone, Copy)]
pub struct DecodeBudget {
    /// Maximum number of new tokens
    pub max_new_tokens: usize,
    /// Abort generation after this long
    pub deadline: Option<Duration>,
}

impl DecodeBudget {
    /// Whether another token may be decoded after `generated` tokens
    ///
    /// Returns `Ok(false)` at the length cap and an error once the deadline
    /// has passed.
    pub fn check(&self, generated: usize, elapsed: Duration) -> Result<bool> {
        if let Some(deadline) = self.deadline {
            if elapsed > deadline {
                anyhow::bail!(
                    "Emotion generation exceeded deadline of {:?} after {} tokens",
                    deadline,
                    generated
                );
            }
        }
        Ok(generated < self.max_new_tokens)
    }
}

impl From<&GenerationConfig> for DecodeBudget {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            deadline: config.deadline,
        }
    }
}

/// Index where the answer begins: just past the last marker, or 0 without one
pub fn answer_start(output_ids: &[u32], marker: u32) -> usize {
    output_ids
        .iter()
        .rposition(|&id| id == marker)
        .map_or(0, |pos| pos + 1)
}

/// Qwen3 causal LM used as the emotion model
pub struct QwenGenerator {
    model: ModelForCausalLM,
    tokenizer: ChatTokenizer,
    device: Device,
    config: GenerationConfig,
}

impl QwenGenerator {
    /// Load model weights and tokenizer from a HuggingFace-style directory
    pub fn load<P: AsRef<Path>>(
        model_dir: P,
        device: &Device,
        dtype: DType,
        config: GenerationConfig,
    ) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        if !model_dir.is_dir() {
            anyhow::bail!("Emotion model directory not found: {:?}", model_dir);
        }

        let config_path = model_dir.join("config.json");
        let model_config: Qwen3Config = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {:?}", config_path))?,
        )
        .with_context(|| format!("Unsupported model config {:?}", config_path))?;

        let weights = safetensors_files(model_dir)?;
        tracing::info!(
            "Loading Qwen emotion model from {:?} ({} shard(s), {:?})",
            model_dir,
            weights.len(),
            dtype
        );
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights, dtype, device)? };
        let model = ModelForCausalLM::new(&model_config, vb)
            .context("Failed to build Qwen3 model")?;

        let tokenizer = ChatTokenizer::load(model_dir.join("tokenizer.json"))?;
        if tokenizer.stop_token_ids.is_empty() {
            tracing::warn!("Tokenizer has no chat stop tokens, generation runs to the length cap");
        }

        Ok(Self {
            model,
            tokenizer,
            device: device.clone(),
            config,
        })
    }

    /// Generate token ids for a rendered prompt
    fn generate_ids(&mut self, prompt_ids: &[u32]) -> Result<Vec<u32>> {
        let started = Instant::now();
        let mut logits_processor =
            LogitsProcessor::from_sampling(self.config.seed, Sampling::ArgMax);
        self.model.clear_kv_cache();

        let mut output_ids = Vec::new();
        let mut input = Tensor::new(prompt_ids, &self.device)?.unsqueeze(0)?;
        let mut offset = 0;

        let budget = DecodeBudget::from(&self.config);
        while budget.check(output_ids.len(), started.elapsed())? {
            let seq_len = input.dim(1)?;
            let logits = self.model.forward(&input, offset)?;
            let logits = logits.squeeze(0)?.squeeze(0)?.to_dtype(DType::F32)?;
            let next = logits_processor.sample(&logits)?;
            offset += seq_len;

            if self.tokenizer.is_stop_token(next) {
                break;
            }
            output_ids.push(next);
            input = Tensor::new(&[next], &self.device)?.unsqueeze(0)?;
        }

        tracing::debug!(
            "Generated {} tokens in {:.2}s",
            output_ids.len(),
            started.elapsed().as_secs_f32()
        );
        Ok(output_ids)
    }
}

impl TextGenerator for QwenGenerator {
    fn generate(&mut self, system_prompt: &str, user_text: &str) -> Result<String> {
        let prompt = classification_prompt(system_prompt, user_text);
        let prompt_ids = self.tokenizer.encode(&prompt)?;
        let output_ids = self.generate_ids(&prompt_ids)?;
        let start = answer_start(&output_ids, self.config.answer_marker_token_id);
        self.tokenizer.decode(&output_ids[start..])
    }
}

/// Weight files of a checkpoint directory, sorted by name
fn safetensors_files(model_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(model_dir)
        .with_context(|| format!("Failed to list {:?}", model_dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |e| e == "safetensors"))
        .collect();
    if files.is_empty() {
        anyhow::bail!("No .safetensors weights in {:?}", model_dir);
    }
    files.sort();
    Ok(files)
}
