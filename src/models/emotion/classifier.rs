//! Text emotion classification
//!
//! [`EmotionClassifier`] prompts a text generator with a fixed instruction,
//! parses the answer and normalizes it into an [`EmotionVector`]. Failures of
//! the generator surface as [`EmotionError::Classification`]; recovering from
//! them is the job of [`super::ResilientClassifier`].

use parking_lot::Mutex;

use super::output_parser::{classification_to_vector, parse_model_output};
use super::vector::EmotionVector;
use crate::error::{EmotionError, EmotionResult};

/// Default system instruction understood by the Qwen emotion model
pub const DEFAULT_SYSTEM_PROMPT: &str = "文本情感分类";

/// Chat-style text generation capability
///
/// Implementations return only the answer segment of the decoded output.
pub trait TextGenerator: Send {
    /// Generate an answer for `user_text` under `system_prompt`
    fn generate(&mut self, system_prompt: &str, user_text: &str) -> anyhow::Result<String>;
}

impl<F> TextGenerator for F
where
    F: FnMut(&str, &str) -> anyhow::Result<String> + Send,
{
    fn generate(&mut self, system_prompt: &str, user_text: &str) -> anyhow::Result<String> {
        self(system_prompt, user_text)
    }
}

/// Anything that can turn free text into an emotion vector
pub trait EmotionInference: Send + Sync {
    /// Classify `text`
    fn infer(&self, text: &str) -> EmotionResult<EmotionVector>;
}

/// Language-model backed emotion classifier
pub struct EmotionClassifier<G: TextGenerator> {
    /// Generation calls are not reentrant, so they are serialized here
    generator: Mutex<G>,
    system_prompt: String,
}

impl<G: TextGenerator> EmotionClassifier<G> {
    /// Create a classifier with the default system prompt
    pub fn new(generator: G) -> Self {
        Self::with_prompt(generator, DEFAULT_SYSTEM_PROMPT)
    }

    /// Create a classifier with a custom system prompt
    pub fn with_prompt(generator: G, system_prompt: impl Into<String>) -> Self {
        Self {
            generator: Mutex::new(generator),
            system_prompt: system_prompt.into(),
        }
    }

    /// Run the generator and return the raw answer text
    pub fn generate_answer(&self, text: &str) -> EmotionResult<String> {
        let mut generator = self.generator.lock();
        generator
            .generate(&self.system_prompt, text)
            .map_err(|e| EmotionError::Classification(format!("{:#}", e)))
    }
}

impl<G: TextGenerator> EmotionInference for EmotionClassifier<G> {
    fn infer(&self, text: &str) -> EmotionResult<EmotionVector> {
        let answer = self.generate_answer(text)?;
        tracing::debug!(answer = %answer, "Emotion model answer");

        let raw = parse_model_output(&answer);
        let vector = classification_to_vector(text, &raw);
        tracing::debug!(parsed = raw.len(), vector = %vector, "Emotion classified");
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::emotion::EmotionLabel;

    #[test]
    fn test_well_formed_answer() {
        let classifier = EmotionClassifier::new(|_: &str, _: &str| -> anyhow::Result<String> {
            Ok(r#"{"高兴": 0.9, "自然": 0.05}"#.to_string())
        });
        let v = classifier.infer("We won the cup!").unwrap();
        assert_eq!(v.get(EmotionLabel::Happy), 0.9);
        assert_eq!(v.get(EmotionLabel::Calm), 0.05);
    }

    #[test]
    fn test_prompt_forwarded() {
        let classifier = EmotionClassifier::with_prompt(
            |system: &str, user: &str| -> anyhow::Result<String> {
                assert_eq!(system, "classify");
                assert_eq!(user, "hi");
                Ok("{}".to_string())
            },
            "classify",
        );
        assert!(classifier.infer("hi").unwrap().is_neutral());
    }

    #[test]
    fn test_malformed_answer_uses_scan() {
        let classifier = EmotionClassifier::new(|_: &str, _: &str| -> anyhow::Result<String> {
            Ok("愤怒: 0.7, 惊讶: 0.3 and some trailing".to_string())
        });
        let v = classifier.infer("How dare you").unwrap();
        assert_eq!(v.get(EmotionLabel::Angry), 0.7);
        assert_eq!(v.get(EmotionLabel::Surprised), 0.3);
    }

    #[test]
    fn test_generator_error_propagates() {
        let classifier = EmotionClassifier::new(|_: &str, _: &str| -> anyhow::Result<String> {
            anyhow::bail!("model offline")
        });
        match classifier.infer("anything") {
            Err(EmotionError::Classification(msg)) => assert!(msg.contains("model offline")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
