//! Qwen emotion model backend
//!
//! The classifier factory picks the device and precision at construction:
//! accelerators run in BF16, CPU-only hosts in F32.

mod generator;

pub use generator::{answer_start, DecodeBudget, GenerationConfig, QwenGenerator};

use anyhow::Result;
use candle_core::{DType, Device};
use std::path::PathBuf;

use crate::config::EmotionConfig;
use crate::models::emotion::{EmotionClassifier, EmotionClassifierFactory, EmotionInference};

/// Device and precision of the emotion model
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    /// Device the weights are placed on
    pub device: Device,
    /// Weight precision
    pub dtype: DType,
}

impl DeviceSelection {
    /// CPU with full precision
    pub fn cpu() -> Self {
        Self {
            device: Device::Cpu,
            dtype: DType::F32,
        }
    }

    /// First CUDA device if requested and available, CPU otherwise
    pub fn detect(use_gpu: bool) -> Result<Self> {
        if !use_gpu {
            return Ok(Self::cpu());
        }
        let device = Device::cuda_if_available(0)?;
        let dtype = if device.is_cpu() { DType::F32 } else { DType::BF16 };
        Ok(Self { device, dtype })
    }

    /// Whether inference runs on the CPU
    pub fn is_cpu(&self) -> bool {
        self.device.is_cpu()
    }
}

/// Builds an [`EmotionClassifier`] over a [`QwenGenerator`]
pub struct QwenClassifierFactory {
    model_dir: PathBuf,
    selection: DeviceSelection,
    config: EmotionConfig,
}

impl QwenClassifierFactory {
    /// Factory for the model in `model_dir`
    pub fn new(
        model_dir: impl Into<PathBuf>,
        selection: DeviceSelection,
        config: EmotionConfig,
    ) -> Self {
        Self {
            model_dir: model_dir.into(),
            selection,
            config,
        }
    }
}

impl EmotionClassifierFactory for QwenClassifierFactory {
    fn name(&self) -> &str {
        if self.selection.is_cpu() {
            "qwen-cpu"
        } else {
            "qwen-accelerated"
        }
    }

    fn build(&self) -> Result<Box<dyn EmotionInference>> {
        let generator = QwenGenerator::load(
            &self.model_dir,
            &self.selection.device,
            self.selection.dtype,
            GenerationConfig::from(self.config.clone()),
        )?;
        Ok(Box::new(EmotionClassifier::with_prompt(
            generator,
            self.config.system_prompt.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::emotion::{ClassifierState, EmotionVector, ResilientClassifier};
    use std::time::Duration;

    #[test]
    fn test_cpu_selection() {
        let selection = DeviceSelection::detect(false).unwrap();
        assert!(selection.is_cpu());
        assert_eq!(selection.dtype, DType::F32);
    }

    #[test]
    fn test_factory_name_follows_device() {
        let factory = QwenClassifierFactory::new(
            "checkpoints/qwen",
            DeviceSelection::cpu(),
            EmotionConfig::default(),
        );
        assert_eq!(factory.name(), "qwen-cpu");
    }

    #[test]
    fn test_deadline_overrun_yields_neutral() {
        let budget = DecodeBudget {
            max_new_tokens: 512,
            deadline: Some(Duration::from_millis(10)),
        };
        let generator = move |_: &str, _: &str| -> Result<String> {
            budget.check(3, Duration::from_millis(25))?;
            Ok(r#"{"愤怒": 0.9}"#.to_string())
        };
        let classifier = ResilientClassifier::ready(Box::new(EmotionClassifier::new(generator)));

        assert_eq!(classifier.infer("Get out!"), EmotionVector::neutral());
        assert_eq!(classifier.failure_count(), 1);
        assert_eq!(classifier.state(), ClassifierState::Ready);
    }

    #[test]
    fn test_missing_model_degrades() {
        let factory = QwenClassifierFactory::new(
            "does/not/exist/qwen0.6bemo4-merge",
            DeviceSelection::cpu(),
            EmotionConfig::default(),
        );
        let classifier = ResilientClassifier::construct(&factory);
        assert_eq!(classifier.state(), ClassifierState::Degraded);
        assert!(classifier.infer("I am furious").is_neutral());
    }
}
