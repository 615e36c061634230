//! Inference module for emotion resolution
//!
//! This module provides the request-level entry points:
//! - Predictor: setup-once, predict-many orchestration
//! - EmotionResolver: per-request choice of vector, text or default
//! - SynthesisRequest: request parameters and their bounds
//! - parse_emotion_vector: explicit vector parsing

mod predictor;
mod request;
mod resolver;
mod vector_parser;

pub use predictor::{Predictor, SpeechSynthesizer, SynthesisJob};
pub use request::{EmotionRequest, SamplingParams, SynthesisRequest};
pub use resolver::{
    normalize_emotion_vector, scale_emotion_vector, EmotionConditioning, EmotionDirective,
    EmotionResolver, EMOTION_BIAS, MAX_VECTOR_SUM,
};
pub use vector_parser::parse_emotion_vector;
