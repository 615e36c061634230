//! # IndexTTS2 Emotion Resolution
//!
//! Turns the optional emotion inputs of an IndexTTS2 synthesis request into a
//! single emotion instruction for the synthesis engine.
//!
//! ## Features
//!
//! - Explicit 8-value emotion vectors (JSON or comma separated)
//! - Emotion classification of free text with a local Qwen3 model via Candle
//! - Tolerant parsing of malformed model output
//! - Neutral fallback whenever the classifier is missing or fails
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use indextts2_emotion::inference::{EmotionResolver, EmotionRequest};
//!
//! let resolver = EmotionResolver::new(None);
//! let directive = resolver.resolve(&EmotionRequest {
//!     emotion_vector: Some("0,0,0.8,0,0,0,0,0".into()),
//!     ..Default::default()
//! })?;
//! ```

// Require docs for public items, but not struct fields (too verbose)
#![warn(missing_docs)]
#![allow(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod text;

// Re-exports for convenience
pub use config::{ClassificationMode, EmotionConfig, ModelConfig};
pub use error::{EmotionError, EmotionResult};
pub use inference::{EmotionDirective, EmotionResolver, Predictor};
pub use models::emotion::{
    ClassifierSource, ClassifierState, EmotionLabel, EmotionVector, ResilientClassifier,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
