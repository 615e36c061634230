//! Error types for emotion resolution
//!
//! Only user-input errors ([`EmotionError::InvalidVectorFormat`] and
//! [`EmotionError::InvalidParameter`]) are meant to reach the request boundary.
//! Classifier errors are absorbed by [`crate::models::emotion::ResilientClassifier`].

use thiserror::Error;

/// Result type for emotion operations
pub type EmotionResult<T> = Result<T, EmotionError>;

/// Errors raised while resolving the emotion of a synthesis request
#[derive(Debug, Error)]
pub enum EmotionError {
    /// The explicit emotion vector could not be parsed
    #[error("Could not parse emotion_vector ({reason}); use JSON or comma separated numbers")]
    InvalidVectorFormat { reason: String },

    /// A request parameter is outside its allowed range
    #[error("Invalid value for {name}: {value} (allowed {range})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        range: &'static str,
    },

    /// The text emotion classifier could not be built
    #[error("Emotion classifier unavailable: {0}")]
    ClassifierConstruction(String),

    /// A single classification call failed
    #[error("Emotion classification failed: {0}")]
    Classification(String),
}

impl EmotionError {
    pub(crate) fn invalid_vector(reason: impl Into<String>) -> Self {
        Self::InvalidVectorFormat {
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than infrastructure
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidVectorFormat { .. } | Self::InvalidParameter { .. }
        )
    }
}
