//! Parsing of the emotion model's answer text
//!
//! Two stages: a strict JSON object parse, then a tolerant `label: number`
//! scan. The scan never fails; unparsable text yields an empty classification.
//! After parsing, the sad/melancholic disambiguation is applied and the scores
//! are folded into an [`EmotionVector`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::vector::{EmotionLabel, EmotionVector};

/// Words that make the classifier confuse `sad` with `melancholic`
pub const MELANCHOLIC_TRIGGERS: [&str; 6] = [
    "低落",
    "melancholy",
    "melancholic",
    "depression",
    "depressed",
    "gloomy",
];

static LABEL_SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s":.,]+?)"?\s*:\s*([\d.]+)"#).expect("valid label/score regex")
});

/// Unvalidated token → score mapping decoded from the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawClassification {
    scores: HashMap<String, f32>,
}

impl RawClassification {
    /// Empty classification
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a score; a repeated token overwrites the earlier value
    pub fn insert(&mut self, token: impl Into<String>, score: f32) {
        self.scores.insert(token.into(), score);
    }

    /// Raw score for a token
    pub fn get(&self, token: &str) -> Option<f32> {
        self.scores.get(token).copied()
    }

    /// Number of tokens parsed
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether nothing was parsed
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Map native tokens onto labels, dropping anything else
    pub fn label_scores(&self) -> HashMap<EmotionLabel, f32> {
        self.scores
            .iter()
            .filter_map(|(token, score)| {
                let token =
                    token.trim_matches(|c: char| "{}[]'\"".contains(c) || c.is_whitespace());
                EmotionLabel::from_token(token).map(|label| (label, *score))
            })
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, f32)> for RawClassification {
    fn from_iter<I: IntoIterator<Item = (K, f32)>>(iter: I) -> Self {
        let mut raw = Self::new();
        for (k, v) in iter {
            raw.insert(k, v);
        }
        raw
    }
}

/// Parse the answer text: strict JSON first, tolerant scan second
pub fn parse_model_output(content: &str) -> RawClassification {
    match parse_strict(content) {
        Some(raw) => raw,
        None => {
            tracing::debug!("Emotion output is not a JSON object, using tolerant scan");
            scan_tolerant(content)
        }
    }
}

/// Parse a JSON object of token → number
///
/// Returns `None` when the text is not a JSON object. Values that are not
/// numbers (or numeric strings) are skipped.
pub fn parse_strict(content: &str) -> Option<RawClassification> {
    let value: serde_json::Value = serde_json::from_str(content.trim()).ok()?;
    let object = value.as_object()?;

    let raw = object
        .iter()
        .filter_map(|(k, v)| {
            let score = match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }?;
            Some((k.clone(), score as f32))
        })
        .collect();
    Some(raw)
}

/// Extract every `label: number` pair from free-form text
pub fn scan_tolerant(content: &str) -> RawClassification {
    LABEL_SCORE_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let token = caps.get(1)?.as_str();
            let score = caps.get(2)?.as_str().parse::<f32>().ok()?;
            Some((token.to_string(), score))
        })
        .collect()
}

/// Whether the text mentions a melancholy trigger word (case-insensitive)
pub fn contains_melancholic_trigger(text: &str) -> bool {
    let lower = text.to_lowercase();
    MELANCHOLIC_TRIGGERS.iter().any(|w| lower.contains(w))
}

/// Swap the `sad` and `melancholic` scores; a missing score counts as 0
pub fn swap_sad_melancholic(scores: &mut HashMap<EmotionLabel, f32>) {
    let sad = scores.get(&EmotionLabel::Sad).copied().unwrap_or(0.0);
    let melancholic = scores.get(&EmotionLabel::Melancholic).copied().unwrap_or(0.0);
    scores.insert(EmotionLabel::Sad, melancholic);
    scores.insert(EmotionLabel::Melancholic, sad);
}

/// Turn a raw classification of `input_text` into a normalized vector
pub fn classification_to_vector(input_text: &str, raw: &RawClassification) -> EmotionVector {
    let mut scores = raw.label_scores();
    if contains_melancholic_trigger(input_text) {
        swap_sad_melancholic(&mut scores);
    }
    EmotionVector::from_label_scores(&scores)
}
