//! Emotion processing for TTS
//!
//! Provides the text side of emotion control:
//! - Eight-label emotion vector with clamping and neutral fallback
//! - Tolerant parsing of the emotion model's answer
//! - Language-model backed classifier
//! - Fallback wrapper that keeps synthesis alive when the classifier is missing

mod classifier;
mod output_parser;
mod resilient;
mod vector;

pub use classifier::{EmotionClassifier, EmotionInference, TextGenerator, DEFAULT_SYSTEM_PROMPT};
pub use output_parser::{
    classification_to_vector, contains_melancholic_trigger, parse_model_output, parse_strict,
    scan_tolerant, swap_sad_melancholic, RawClassification, MELANCHOLIC_TRIGGERS,
};
pub use resilient::{
    ClassifierSource, ClassifierState, EmotionClassifierFactory, ResilientClassifier,
};
pub use vector::{clamp_score, EmotionLabel, EmotionVector, MAX_SCORE, MIN_SCORE, NUM_EMOTIONS};
