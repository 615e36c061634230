//! Synthesis request parameters
//!
//! Mirrors the predictor inputs with their defaults and allowed ranges.
//! Sampling parameters are passed through to the synthesis engine as-is.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{EmotionError, EmotionResult};

/// Sampling controls for the GPT stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Silence between long segments (ms)
    pub interval_silence_ms: u32,
    /// Maximum BPE tokens per autoregressive segment
    pub max_text_tokens_per_segment: usize,
    /// Nucleus sampling threshold
    pub top_p: f32,
    /// Top-k sampling
    pub top_k: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Beam search length penalty
    pub length_penalty: f32,
    /// Beam width
    pub num_beams: usize,
    /// Penalty for repeated tokens
    pub repetition_penalty: f32,
    /// Maximum mel tokens per segment
    pub max_mel_tokens: usize,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            interval_silence_ms: 200,
            max_text_tokens_per_segment: 120,
            top_p: 0.8,
            top_k: 30,
            temperature: 0.8,
            length_penalty: 0.0,
            num_beams: 3,
            repetition_penalty: 10.0,
            max_mel_tokens: 1500,
        }
    }
}

impl SamplingParams {
    /// Check every value against its allowed range
    pub fn validate(&self) -> EmotionResult<()> {
        check_range(
            "interval_silence_ms",
            self.interval_silence_ms as f64,
            0.0,
            2000.0,
            "[0, 2000]",
        )?;
        check_range(
            "max_text_tokens_per_segment",
            self.max_text_tokens_per_segment as f64,
            32.0,
            300.0,
            "[32, 300]",
        )?;
        check_range("top_p", self.top_p as f64, 0.0, 1.0, "[0, 1]")?;
        check_range("top_k", self.top_k as f64, 1.0, 200.0, "[1, 200]")?;
        check_range("temperature", self.temperature as f64, 0.0, 2.0, "[0, 2]")?;
        check_range("length_penalty", self.length_penalty as f64, 0.0, 5.0, "[0, 5]")?;
        check_range("num_beams", self.num_beams as f64, 1.0, 8.0, "[1, 8]")?;
        check_range("repetition_penalty", self.repetition_penalty as f64, 1.0, 30.0, "[1, 30]")?;
        check_range("max_mel_tokens", self.max_mel_tokens as f64, 256.0, 4096.0, "[256, 4096]")?;
        Ok(())
    }
}

/// Emotion-related request inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRequest {
    /// Raw explicit vector: JSON array or comma separated numbers
    pub emotion_vector: Option<String>,
    /// Free text describing the desired emotion
    pub emotion_text: Option<String>,
    /// Emotion reference audio
    pub emotion_audio: Option<PathBuf>,
    /// Blend weight of the emotion reference
    pub emotion_scale: f32,
    /// Pick emotion embeddings randomly instead of nearest-neighbour
    pub randomize_emotion: bool,
}

impl Default for EmotionRequest {
    fn default() -> Self {
        Self {
            emotion_vector: None,
            emotion_text: None,
            emotion_audio: None,
            emotion_scale: 1.0,
            randomize_emotion: false,
        }
    }
}

impl EmotionRequest {
    /// Check the blend weight range
    pub fn validate(&self) -> EmotionResult<()> {
        check_range("emotion_scale", self.emotion_scale as f64, 0.0, 1.0, "[0, 1]")
    }

    /// Emotion text if present and not blank
    pub fn emotion_text(&self) -> Option<&str> {
        self.emotion_text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Full synthesis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Text to synthesize
    pub text: String,
    /// Reference audio of the target speaker
    pub speaker_audio: PathBuf,
    /// Emotion inputs
    #[serde(flatten)]
    pub emotion: EmotionRequest,
    /// GPT sampling controls
    #[serde(flatten)]
    pub sampling: SamplingParams,
}

impl SynthesisRequest {
    /// Request with default emotion and sampling settings
    pub fn new(text: impl Into<String>, speaker_audio: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            speaker_audio: speaker_audio.into(),
            emotion: EmotionRequest::default(),
            sampling: SamplingParams::default(),
        }
    }

    /// Set the explicit emotion vector
    pub fn with_emotion_vector(mut self, raw: impl Into<String>) -> Self {
        self.emotion.emotion_vector = Some(raw.into());
        self
    }

    /// Set the emotion text
    pub fn with_emotion_text(mut self, text: impl Into<String>) -> Self {
        self.emotion.emotion_text = Some(text.into());
        self
    }

    /// Set the emotion reference audio
    pub fn with_emotion_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.emotion.emotion_audio = Some(path.into());
        self
    }

    /// Set the emotion blend weight
    pub fn with_emotion_scale(mut self, scale: f32) -> Self {
        self.emotion.emotion_scale = scale;
        self
    }

    /// Validate all parameters
    pub fn validate(&self) -> EmotionResult<()> {
        if self.text.trim().is_empty() {
            return Err(EmotionError::InvalidParameter {
                name: "text",
                value: format!("{:?}", self.text),
                range: "non-empty text",
            });
        }
        self.emotion.validate()?;
        self.sampling.validate()
    }
}

fn check_range(
    name: &'static str,
    value: f64,
    min: f64,
    max: f64,
    range: &'static str,
) -> EmotionResult<()> {
    if value.is_nan() || value < min || value > max {
        return Err(EmotionError::InvalidParameter {
            name,
            value: value.to_string(),
            range,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let request = SynthesisRequest::new("Hello", "speaker.wav");
        assert!(request.validate().is_ok());
        assert_eq!(request.emotion.emotion_scale, 1.0);
        assert_eq!(request.sampling.top_k, 30);
        assert_eq!(request.sampling.max_mel_tokens, 1500);
    }

    #[test]
    fn test_emotion_scale_bounds() {
        let request = SynthesisRequest::new("Hello", "speaker.wav").with_emotion_scale(1.5);
        match request.validate() {
            Err(EmotionError::InvalidParameter { name, .. }) => assert_eq!(name, "emotion_scale"),
            other => panic!("unexpected: {:?}", other),
        }
        let request = SynthesisRequest::new("Hello", "speaker.wav").with_emotion_scale(f32::NAN);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_sampling_bounds() {
        let mut request = SynthesisRequest::new("Hello", "speaker.wav");
        request.sampling.num_beams = 9;
        assert!(request.validate().unwrap_err().is_user_error());

        let mut request = SynthesisRequest::new("Hello", "speaker.wav");
        request.sampling.max_text_tokens_per_segment = 16;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_blank_text_rejected() {
        assert!(SynthesisRequest::new("  ", "speaker.wav").validate().is_err());
    }

    #[test]
    fn test_blank_emotion_text_is_absent() {
        let request = EmotionRequest {
            emotion_text: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(request.emotion_text(), None);
    }

    #[test]
    fn test_deserialize_flat_request() {
        let json = r#"{
            "text": "Hi",
            "speaker_audio": "spk.wav",
            "emotion_vector": "0,0,1,0,0,0,0,0",
            "emotion_text": null,
            "emotion_audio": null,
            "emotion_scale": 0.6,
            "randomize_emotion": true,
            "interval_silence_ms": 200,
            "max_text_tokens_per_segment": 120,
            "top_p": 0.8,
            "top_k": 30,
            "temperature": 0.8,
            "length_penalty": 0.0,
            "num_beams": 3,
            "repetition_penalty": 10.0,
            "max_mel_tokens": 1500
        }"#;
        let request: SynthesisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.emotion.emotion_scale, 0.6);
        assert!(request.emotion.randomize_emotion);
        assert!(request.validate().is_ok());
    }
}
