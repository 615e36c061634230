//! Model components for emotion resolution
//!
//! - Emotion vector, output parsing, classifier and fallback wrapper
//! - Qwen3 text generation backend for the classifier

pub mod emotion;
pub mod qwen;

// Re-exports
pub use emotion::{EmotionClassifier, EmotionVector, ResilientClassifier};
pub use qwen::{QwenClassifierFactory, QwenGenerator};
