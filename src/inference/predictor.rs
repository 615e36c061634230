//! Request orchestration
//!
//! [`Predictor`] installs the emotion classifier once during setup, then for
//! each request validates inputs, resolves the emotion directive and hands a
//! [`SynthesisJob`] to the synthesis engine. Classifier problems never fail a
//! request; malformed inputs do.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::request::{SamplingParams, SynthesisRequest};
use super::resolver::{EmotionDirective, EmotionResolver};
use crate::config::ClassificationMode;
use crate::models::emotion::{ClassifierSource, ClassifierState, ResilientClassifier};

/// Everything the synthesis engine needs for one request
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    /// Text to synthesize
    pub text: String,
    /// Reference audio of the target speaker
    pub speaker_audio: PathBuf,
    /// Resolved emotion instruction
    pub emotion: EmotionDirective,
    /// Sampling controls, uninterpreted
    pub sampling: SamplingParams,
    /// Where the engine writes the waveform
    pub output_path: PathBuf,
}

/// The speech synthesis engine
pub trait SpeechSynthesizer {
    /// Synthesize `job`, returning the path of the written audio
    ///
    /// `classifier` is available for lazily classifying the directive's text.
    fn synthesize(
        &mut self,
        job: &SynthesisJob,
        classifier: Option<&ResilientClassifier>,
    ) -> Result<PathBuf>;
}

/// Setup-once, predict-many request pipeline
pub struct Predictor<S: SpeechSynthesizer> {
    synthesizer: S,
    resolver: EmotionResolver,
    mode: ClassificationMode,
    /// Request outputs live as long as the predictor
    output_root: tempfile::TempDir,
    requests: u64,
}

impl<S: SpeechSynthesizer> Predictor<S> {
    /// Create a predictor with no classifier installed
    pub fn new(synthesizer: S, mode: ClassificationMode) -> Result<Self> {
        let output_root = tempfile::Builder::new()
            .prefix("indextts2-")
            .tempdir()
            .context("Failed to create output directory")?;
        Ok(Self {
            synthesizer,
            resolver: EmotionResolver::with_mode(None, mode),
            mode,
            output_root,
            requests: 0,
        })
    }

    /// Install the emotion classifier
    ///
    /// Runs once per predictor: the fallback layer is added a single time and
    /// a later setup keeps the installed classifier instead of rebuilding it.
    pub fn setup(&mut self, source: ClassifierSource) -> Arc<ResilientClassifier> {
        if let Some(installed) = self.resolver.shared_classifier() {
            debug!("Emotion classifier already installed ({})", installed.state());
            return installed;
        }
        let classifier = source.into_guarded();
        info!("Emotion classifier {}", classifier.state());
        self.resolver = EmotionResolver::with_mode(Some(classifier.clone()), self.mode);
        classifier
    }

    /// Lifecycle state of the installed classifier
    pub fn classifier_state(&self) -> ClassifierState {
        self.resolver
            .classifier()
            .map_or(ClassifierState::Uninitialized, |c| c.state())
    }

    /// Installed classifier, shareable with other pipelines
    pub fn classifier(&self) -> Option<Arc<ResilientClassifier>> {
        self.resolver.shared_classifier()
    }

    /// Resolve the emotion directive of a request without synthesizing
    pub fn resolve(&self, request: &SynthesisRequest) -> Result<EmotionDirective> {
        request.validate()?;
        Ok(self.resolver.resolve(&request.emotion)?)
    }

    /// Run one request through the synthesis engine
    pub fn predict(&mut self, request: &SynthesisRequest) -> Result<PathBuf> {
        let emotion = self.resolve(request)?;
        self.requests += 1;
        let output_dir = self.output_root.path().join(format!("request-{:06}", self.requests));
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {:?}", output_dir))?;

        let job = SynthesisJob {
            text: request.text.clone(),
            speaker_audio: request.speaker_audio.clone(),
            emotion,
            sampling: request.sampling.clone(),
            output_path: output_dir.join("output.wav"),
        };

        self.synthesizer
            .synthesize(&job, self.resolver.classifier())
            .context("Synthesis failed")
    }

    /// The wrapped synthesis engine
    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmotionError;
    use crate::models::emotion::EmotionInference;

    #[derive(Default)]
    struct Recorder {
        jobs: Vec<SynthesisJob>,
    }

    impl SpeechSynthesizer for Recorder {
        fn synthesize(
            &mut self,
            job: &SynthesisJob,
            _classifier: Option<&ResilientClassifier>,
        ) -> Result<PathBuf> {
            self.jobs.push(job.clone());
            Ok(job.output_path.clone())
        }
    }

    #[test]
    fn test_uninitialized_before_setup() {
        let predictor = Predictor::new(Recorder::default(), ClassificationMode::Lazy).unwrap();
        assert_eq!(predictor.classifier_state(), ClassifierState::Uninitialized);
        assert!(predictor.classifier().is_none());
    }

    #[test]
    fn test_setup_runs_once() {
        let mut predictor = Predictor::new(Recorder::default(), ClassificationMode::Lazy).unwrap();
        let degraded = Arc::new(ResilientClassifier::degraded("no model"));
        let first = predictor.setup(ClassifierSource::Guarded(degraded));
        let rebuild = || -> Result<Box<dyn EmotionInference>> { panic!("must not rebuild") };
        let second = predictor.setup(ClassifierSource::Factory(Box::new(rebuild)));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(predictor.classifier_state(), ClassifierState::Degraded);
    }

    #[test]
    fn test_predict_forwards_job() {
        let mut predictor = Predictor::new(Recorder::default(), ClassificationMode::Lazy).unwrap();
        let request =
            SynthesisRequest::new("Hello there", "spk.wav").with_emotion_vector("1,0,0,0,0,0,0,0");
        let output = predictor.predict(&request).unwrap();
        assert!(output.ends_with("output.wav"));
        assert!(output.parent().unwrap().is_dir());

        let job = &predictor.synthesizer().jobs[0];
        assert_eq!(job.text, "Hello there");
        assert_eq!(job.emotion.vector, Some(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        assert_eq!(job.sampling, SamplingParams::default());
    }

    #[test]
    fn test_each_request_gets_its_own_output() {
        let mut predictor = Predictor::new(Recorder::default(), ClassificationMode::Lazy).unwrap();
        let request = SynthesisRequest::new("Hello", "spk.wav");
        let a = predictor.predict(&request).unwrap();
        let b = predictor.predict(&request).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_vector_is_a_user_error() {
        let mut predictor = Predictor::new(Recorder::default(), ClassificationMode::Lazy).unwrap();
        let request = SynthesisRequest::new("Hello", "spk.wav").with_emotion_vector("happy");
        let err = predictor.predict(&request).unwrap_err();
        let emotion_err = err.downcast_ref::<EmotionError>().unwrap();
        assert!(emotion_err.is_user_error());
        assert!(predictor.synthesizer().jobs.is_empty());
    }
}
