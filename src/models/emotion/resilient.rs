//! Fallback wrapper around the emotion classifier
//!
//! Emotion text is an optional feature: a classifier that cannot be built or
//! fails at runtime must never abort synthesis. [`ResilientClassifier`] turns
//! every construction failure, inference error and panic into the neutral
//! vector.
//!
//! Lifecycle: `Uninitialized -> Ready | Degraded`. Degraded is permanent; the
//! inner classifier is never rebuilt.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::classifier::EmotionInference;
use super::vector::EmotionVector;
use crate::error::EmotionError;

/// Lifecycle of the wrapped classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierState {
    /// Setup has not run yet
    Uninitialized,
    /// Inner classifier built and in use
    Ready,
    /// Construction failed; every call returns the neutral vector
    Degraded,
}

impl fmt::Display for ClassifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClassifierState::Uninitialized => "uninitialized",
            ClassifierState::Ready => "ready",
            ClassifierState::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// Builds the inner classifier; selected by the caller per environment
pub trait EmotionClassifierFactory: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Build the classifier, typically loading model weights
    fn build(&self) -> anyhow::Result<Box<dyn EmotionInference>>;
}

impl<F> EmotionClassifierFactory for F
where
    F: Fn() -> anyhow::Result<Box<dyn EmotionInference>> + Send,
{
    fn name(&self) -> &str {
        "custom"
    }

    fn build(&self) -> anyhow::Result<Box<dyn EmotionInference>> {
        self()
    }
}

/// Classifier that always answers, falling back to the neutral vector
pub struct ResilientClassifier {
    inner: Option<Box<dyn EmotionInference>>,
    construction_error: Option<EmotionError>,
    failures: AtomicUsize,
}

impl ResilientClassifier {
    /// Build the inner classifier through `factory`
    ///
    /// Any error or panic during construction yields a degraded wrapper.
    pub fn construct(factory: &dyn EmotionClassifierFactory) -> Self {
        info!("Building emotion classifier ({})", factory.name());
        let built = match catch_unwind(AssertUnwindSafe(|| factory.build())) {
            Ok(Ok(inner)) => Ok(inner),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(panic) => Err(format!("panicked: {}", panic_message(&panic))),
        };

        match built {
            Ok(inner) => Self::ready(inner),
            Err(reason) => Self::degraded(reason),
        }
    }

    /// Wrap an already built classifier
    pub fn ready(inner: Box<dyn EmotionInference>) -> Self {
        Self {
            inner: Some(inner),
            construction_error: None,
            failures: AtomicUsize::new(0),
        }
    }

    /// Wrapper with no classifier at all
    pub fn degraded(reason: impl Into<String>) -> Self {
        let error = EmotionError::ClassifierConstruction(reason.into());
        warn!(error = %error, "Falling back to neutral emotion");
        Self {
            inner: None,
            construction_error: Some(error),
            failures: AtomicUsize::new(0),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ClassifierState {
        if self.inner.is_some() {
            ClassifierState::Ready
        } else {
            ClassifierState::Degraded
        }
    }

    /// Why construction failed, if it did
    pub fn construction_error(&self) -> Option<&EmotionError> {
        self.construction_error.as_ref()
    }

    /// Number of inference calls that fell back to neutral
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Classify `text`, never failing
    pub fn infer(&self, text: &str) -> EmotionVector {
        let Some(inner) = self.inner.as_ref() else {
            return EmotionVector::neutral();
        };

        let error = match catch_unwind(AssertUnwindSafe(|| inner.infer(text))) {
            Ok(Ok(vector)) => return vector,
            Ok(Err(e)) => e,
            Err(panic) => {
                EmotionError::Classification(format!("panicked: {}", panic_message(&panic)))
            }
        };

        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!(error = %error, "Emotion inference failed, returning neutral emotion");
        EmotionVector::neutral()
    }
}

impl fmt::Debug for ResilientClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClassifier")
            .field("state", &self.state())
            .field("construction_error", &self.construction_error)
            .field("failures", &self.failure_count())
            .finish()
    }
}

/// Where the request pipeline gets its classifier from
///
/// `Guarded` marks a classifier that already carries the fallback layer;
/// installing it again is a no-op.
pub enum ClassifierSource {
    /// Build through a factory, then guard
    Factory(Box<dyn EmotionClassifierFactory>),
    /// Guard a prebuilt classifier
    Instance(Box<dyn EmotionInference>),
    /// Already guarded
    Guarded(Arc<ResilientClassifier>),
}

impl ClassifierSource {
    /// Whether the fallback layer is already present
    pub fn is_guarded(&self) -> bool {
        matches!(self, ClassifierSource::Guarded(_))
    }

    /// Produce the guarded classifier, adding the fallback layer only once
    pub fn into_guarded(self) -> Arc<ResilientClassifier> {
        match self {
            ClassifierSource::Factory(factory) => {
                Arc::new(ResilientClassifier::construct(factory.as_ref()))
            }
            ClassifierSource::Instance(inner) => Arc::new(ResilientClassifier::ready(inner)),
            ClassifierSource::Guarded(guarded) => guarded,
        }
    }
}

impl From<Arc<ResilientClassifier>> for ClassifierSource {
    fn from(guarded: Arc<ResilientClassifier>) -> Self {
        ClassifierSource::Guarded(guarded)
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
