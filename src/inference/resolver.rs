//! Per-request emotion resolution
//!
//! Chooses between an explicit vector, text classification and the engine's
//! default, first match wins:
//! 1. a non-empty explicit vector
//! 2. non-blank emotion text
//! 3. nothing: the engine uses the emotion audio, or the speaker audio
//!
//! The classifier is never called when an explicit vector is present.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::request::EmotionRequest;
use super::vector_parser::parse_emotion_vector;
use crate::config::ClassificationMode;
use crate::error::EmotionResult;
use crate::models::emotion::{ResilientClassifier, NUM_EMOTIONS};

/// Per-label weights applied before a vector conditions the engine
pub const EMOTION_BIAS: [f32; NUM_EMOTIONS] =
    [0.9375, 0.875, 1.0, 1.0, 0.9375, 0.9375, 0.6875, 0.5625];

/// Upper bound on the sum of a conditioning vector
pub const MAX_VECTOR_SUM: f32 = 0.8;

/// Normalized emotion instruction for the synthesis engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionDirective {
    /// Explicit (or eagerly classified) vector; not clamped or length checked
    pub vector: Option<Vec<f32>>,
    /// Whether the vector comes from classifying `text`
    pub use_text_classification: bool,
    /// Text to classify
    pub text: Option<String>,
    /// Emotion reference audio
    pub audio_reference: Option<PathBuf>,
    /// Blend weight of the emotion reference
    pub blend_scale: f32,
    /// Random emotion embedding selection
    pub randomize: bool,
}

/// Emotion conditioning handed to the acoustic model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionConditioning {
    /// Vector before scaling, as given or as classified
    pub classified: Option<Vec<f32>>,
    /// Scaled and normalized emotion vector
    pub vector: Option<Vec<f32>>,
    /// Audio the emotion embedding is extracted from
    pub reference_audio: PathBuf,
    /// Blend weight of `reference_audio`
    pub reference_alpha: f32,
    /// Random emotion embedding selection
    pub randomize: bool,
}

impl EmotionDirective {
    /// Whether the engine falls back to its audio-derived default
    pub fn is_default(&self) -> bool {
        self.vector.is_none() && !self.use_text_classification
    }

    /// Vector to condition on, classifying lazily when needed
    ///
    /// Without a stored vector the classifier runs on every call. Call once
    /// per request, or use [`EmotionDirective::conditioning`], whose result
    /// keeps the classified vector in `classified`.
    pub fn vector(&self, classifier: Option<&ResilientClassifier>) -> Option<Vec<f32>> {
        if let Some(vector) = &self.vector {
            return Some(vector.clone());
        }
        if !self.use_text_classification {
            return None;
        }
        let text = self.text.as_deref()?;
        let classified = match classifier {
            Some(classifier) => classifier.infer(text),
            None => {
                tracing::warn!("No emotion classifier installed, using neutral emotion");
                crate::models::emotion::EmotionVector::neutral()
            }
        };
        Some(classified.to_vec())
    }

    /// Resolve the directive into the conditioning the engine consumes
    ///
    /// A vector replaces the emotion audio; the speaker audio is then the
    /// reference at full weight. Without a vector, the emotion audio (or the
    /// speaker audio at full weight) is blended with `blend_scale`.
    pub fn conditioning(
        &self,
        classifier: Option<&ResilientClassifier>,
        speaker_audio: &Path,
    ) -> EmotionConditioning {
        let classified = self.vector(classifier);
        let vector = classified
            .clone()
            .map(|v| normalize_emotion_vector(scale_emotion_vector(v, self.blend_scale)));

        let (reference_audio, reference_alpha) = match (&vector, &self.audio_reference) {
            (None, Some(audio)) => (audio.clone(), self.blend_scale),
            _ => (speaker_audio.to_path_buf(), 1.0),
        };

        EmotionConditioning {
            classified,
            vector,
            reference_audio,
            reference_alpha,
            randomize: self.randomize,
        }
    }
}

/// Scale a vector by the blend weight, truncated to four decimals
pub fn scale_emotion_vector(mut vector: Vec<f32>, scale: f32) -> Vec<f32> {
    let scale = scale.clamp(0.0, 1.0);
    if (scale - 1.0).abs() > f32::EPSILON {
        for v in vector.iter_mut() {
            *v = (*v * scale * 10000.0).trunc() / 10000.0;
        }
    }
    vector
}

/// Apply the per-label bias and cap the total at [`MAX_VECTOR_SUM`]
pub fn normalize_emotion_vector(mut vector: Vec<f32>) -> Vec<f32> {
    for (v, b) in vector.iter_mut().zip(EMOTION_BIAS.iter()) {
        *v *= *b;
    }
    let sum: f32 = vector.iter().sum();
    if sum > MAX_VECTOR_SUM {
        let scale = MAX_VECTOR_SUM / sum;
        for v in vector.iter_mut() {
            *v *= scale;
        }
    }
    vector
}

/// Resolves emotion inputs into an [`EmotionDirective`]
pub struct EmotionResolver {
    classifier: Option<Arc<ResilientClassifier>>,
    mode: ClassificationMode,
}

impl EmotionResolver {
    /// Resolver that defers text classification to the synthesis side
    pub fn new(classifier: Option<Arc<ResilientClassifier>>) -> Self {
        Self::with_mode(classifier, ClassificationMode::Lazy)
    }

    /// Resolver with an explicit classification mode
    pub fn with_mode(
        classifier: Option<Arc<ResilientClassifier>>,
        mode: ClassificationMode,
    ) -> Self {
        Self { classifier, mode }
    }

    /// Installed classifier
    pub fn classifier(&self) -> Option<&ResilientClassifier> {
        self.classifier.as_deref()
    }

    /// Installed classifier as a shared handle
    pub fn shared_classifier(&self) -> Option<Arc<ResilientClassifier>> {
        self.classifier.clone()
    }

    /// Classification mode
    pub fn mode(&self) -> ClassificationMode {
        self.mode
    }

    /// Resolve one request
    ///
    /// Fails only when the explicit vector is malformed.
    pub fn resolve(&self, request: &EmotionRequest) -> EmotionResult<EmotionDirective> {
        let mut directive = EmotionDirective {
            vector: None,
            use_text_classification: false,
            text: None,
            audio_reference: request.emotion_audio.clone(),
            blend_scale: request.emotion_scale,
            randomize: request.randomize_emotion,
        };

        if let Some(vector) = parse_emotion_vector(request.emotion_vector.as_deref())? {
            if vector.len() != NUM_EMOTIONS {
                tracing::warn!(
                    "Emotion vector has {} values, expected {}; passing through",
                    vector.len(),
                    NUM_EMOTIONS
                );
            }
            directive.vector = Some(vector);
            return Ok(directive);
        }

        if let Some(text) = request.emotion_text() {
            directive.use_text_classification = true;
            directive.text = Some(text.to_string());
            if self.mode == ClassificationMode::Eager {
                directive.vector = directive.vector(self.classifier());
            }
        }

        Ok(directive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmotionError;

    fn request(vector: Option<&str>, text: Option<&str>) -> EmotionRequest {
        EmotionRequest {
            emotion_vector: vector.map(String::from),
            emotion_text: text.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_vector_wins() {
        let resolver = EmotionResolver::new(None);
        let directive = resolver
            .resolve(&request(Some("[0.1,0.2,0,0,0,0,0,0]"), Some("angry")))
            .unwrap();
        assert_eq!(directive.vector, Some(vec![0.1, 0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        assert!(!directive.use_text_classification);
        assert_eq!(directive.text, None);
    }

    #[test]
    fn test_text_flags_classification() {
        let resolver = EmotionResolver::new(None);
        let directive = resolver.resolve(&request(None, Some("I am scared"))).unwrap();
        assert!(directive.use_text_classification);
        assert_eq!(directive.text.as_deref(), Some("I am scared"));
        assert_eq!(directive.vector, None);
    }

    #[test]
    fn test_nothing_supplied() {
        let resolver = EmotionResolver::new(None);
        let directive = resolver.resolve(&request(Some("  "), Some(""))).unwrap();
        assert!(directive.is_default());
    }

    #[test]
    fn test_malformed_vector_propagates() {
        let resolver = EmotionResolver::new(None);
        let err = resolver.resolve(&request(Some("a,b"), Some("text"))).unwrap_err();
        assert!(matches!(err, EmotionError::InvalidVectorFormat { .. }));
    }

    #[test]
    fn test_wrong_length_passes_through() {
        let resolver = EmotionResolver::new(None);
        let directive = resolver.resolve(&request(Some("0.3,0.4"), None)).unwrap();
        assert_eq!(directive.vector, Some(vec![0.3, 0.4]));
    }

    #[test]
    fn test_scale_truncates() {
        let scaled = scale_emotion_vector(vec![0.33333, 1.0], 0.5);
        assert_eq!(scaled, vec![0.1666, 0.5]);
        assert_eq!(scale_emotion_vector(vec![0.33333], 1.0), vec![0.33333]);
    }

    #[test]
    fn test_normalize_caps_sum() {
        let v = normalize_emotion_vector(vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        let sum: f32 = v.iter().sum();
        assert!((sum - MAX_VECTOR_SUM).abs() < 1e-6);
        assert!((v[2] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_applies_bias() {
        let v = normalize_emotion_vector(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert!((v[7] - 0.5625).abs() < 1e-6);
    }

    #[test]
    fn test_conditioning_without_vector_uses_emotion_audio() {
        let directive = EmotionDirective {
            vector: None,
            use_text_classification: false,
            text: None,
            audio_reference: Some(PathBuf::from("emo.wav")),
            blend_scale: 0.6,
            randomize: false,
        };
        let c = directive.conditioning(None, Path::new("spk.wav"));
        assert_eq!(c.vector, None);
        assert_eq!(c.reference_audio, PathBuf::from("emo.wav"));
        assert_eq!(c.reference_alpha, 0.6);
    }

    #[test]
    fn test_conditioning_defaults_to_speaker() {
        let directive = EmotionDirective {
            vector: None,
            use_text_classification: false,
            text: None,
            audio_reference: None,
            blend_scale: 0.3,
            randomize: true,
        };
        let c = directive.conditioning(None, Path::new("spk.wav"));
        assert_eq!(c.reference_audio, PathBuf::from("spk.wav"));
        assert_eq!(c.reference_alpha, 1.0);
        assert!(c.randomize);
    }

    #[test]
    fn test_conditioning_vector_discards_emotion_audio() {
        let directive = EmotionDirective {
            vector: Some(vec![0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            use_text_classification: false,
            text: None,
            audio_reference: Some(PathBuf::from("emo.wav")),
            blend_scale: 1.0,
            randomize: false,
        };
        let c = directive.conditioning(None, Path::new("spk.wav"));
        assert_eq!(c.reference_audio, PathBuf::from("spk.wav"));
        assert_eq!(c.reference_alpha, 1.0);
        assert_eq!(c.vector.unwrap()[0], 0.5 * 0.9375);
    }

    #[test]
    fn test_lazy_text_without_classifier_is_neutral() {
        let directive = EmotionDirective {
            vector: None,
            use_text_classification: true,
            text: Some("so happy".into()),
            audio_reference: None,
            blend_scale: 1.0,
            randomize: false,
        };
        let v = directive.vector(None).unwrap();
        assert_eq!(v, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_conditioning_classifies_once() {
        use crate::models::emotion::EmotionClassifier;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let classifier = ResilientClassifier::ready(Box::new(EmotionClassifier::new(
            move |_: &str, _: &str| -> anyhow::Result<String> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(r#"{"高兴": 0.6}"#.to_string())
            },
        )));
        let directive = EmotionDirective {
            vector: None,
            use_text_classification: true,
            text: Some("we won".into()),
            audio_reference: None,
            blend_scale: 0.5,
            randomize: false,
        };

        let c = directive.conditioning(Some(&classifier), Path::new("spk.wav"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.classified.as_ref().unwrap()[0], 0.6);
        assert!((c.vector.unwrap()[0] - 0.3 * 0.9375).abs() < 1e-6);
    }
}
