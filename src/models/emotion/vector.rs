//! Emotion labels and the fixed-length emotion vector
//!
//! The label order defines the vector index mapping shared with the
//! synthesis engine's emotion matrix and must never change.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Number of emotion categories
pub const NUM_EMOTIONS: usize = 8;

/// Lowest allowed intensity
pub const MIN_SCORE: f32 = 0.0;

/// Highest allowed intensity
pub const MAX_SCORE: f32 = 1.2;

/// The eight emotion categories in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    /// 高兴
    Happy,
    /// 愤怒
    Angry,
    /// 悲伤
    Sad,
    /// 恐惧
    Afraid,
    /// 反感
    Disgusted,
    /// 低落
    Melancholic,
    /// 惊讶
    Surprised,
    /// 自然
    Calm,
}

impl EmotionLabel {
    /// All labels in vector order
    pub const ALL: [EmotionLabel; NUM_EMOTIONS] = [
        EmotionLabel::Happy,
        EmotionLabel::Angry,
        EmotionLabel::Sad,
        EmotionLabel::Afraid,
        EmotionLabel::Disgusted,
        EmotionLabel::Melancholic,
        EmotionLabel::Surprised,
        EmotionLabel::Calm,
    ];

    /// Position of this label in the vector
    pub fn index(self) -> usize {
        self as usize
    }

    /// English name
    pub fn name(self) -> &'static str {
        match self {
            EmotionLabel::Happy => "happy",
            EmotionLabel::Angry => "angry",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Afraid => "afraid",
            EmotionLabel::Disgusted => "disgusted",
            EmotionLabel::Melancholic => "melancholic",
            EmotionLabel::Surprised => "surprised",
            EmotionLabel::Calm => "calm",
        }
    }

    /// Token the Qwen emotion model emits for this label
    pub fn native_token(self) -> &'static str {
        match self {
            EmotionLabel::Happy => "高兴",
            EmotionLabel::Angry => "愤怒",
            EmotionLabel::Sad => "悲伤",
            EmotionLabel::Afraid => "恐惧",
            EmotionLabel::Disgusted => "反感",
            EmotionLabel::Melancholic => "低落",
            EmotionLabel::Surprised => "惊讶",
            EmotionLabel::Calm => "自然",
        }
    }

    /// Look up a label from the token the classifier emits
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL.iter().copied().find(|l| l.native_token() == token)
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Clamp a raw score into `[MIN_SCORE, MAX_SCORE]`; NaN counts as no signal
pub fn clamp_score(value: f32) -> f32 {
    if value.is_nan() {
        return MIN_SCORE;
    }
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// Bounded intensity profile over the eight emotion labels
///
/// Every value lies in `[0.0, 1.2]` and at least one label is active:
/// when nothing but `calm` carries signal, `calm` is forced to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionVector([f32; NUM_EMOTIONS]);

impl EmotionVector {
    /// The neutral profile: `calm = 1.0`, everything else 0
    pub fn neutral() -> Self {
        let mut values = [0.0; NUM_EMOTIONS];
        values[EmotionLabel::Calm.index()] = 1.0;
        Self(values)
    }

    /// Build a vector from scores in canonical order, clamping each value
    pub fn from_scores(scores: [f32; NUM_EMOTIONS]) -> Self {
        let mut values = scores.map(clamp_score);
        let has_signal = EmotionLabel::ALL
            .iter()
            .filter(|l| **l != EmotionLabel::Calm)
            .any(|l| values[l.index()] > 0.0);
        if !has_signal {
            values[EmotionLabel::Calm.index()] = 1.0;
        }
        Self(values)
    }

    /// Build a vector from a label map; missing labels score 0
    pub fn from_label_scores(scores: &HashMap<EmotionLabel, f32>) -> Self {
        let mut values = [0.0; NUM_EMOTIONS];
        for label in EmotionLabel::ALL {
            values[label.index()] = scores.get(&label).copied().unwrap_or(0.0);
        }
        Self::from_scores(values)
    }

    /// Score for a single label
    pub fn get(&self, label: EmotionLabel) -> f32 {
        self.0[label.index()]
    }

    /// Values in canonical order
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Values as an owned list, the shape the synthesis engine consumes
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// Whether this is the neutral profile
    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }

    /// Label with the highest score
    pub fn dominant(&self) -> EmotionLabel {
        EmotionLabel::ALL
            .iter()
            .copied()
            .fold(EmotionLabel::Calm, |best, l| {
                if self.get(l) > self.get(best) {
                    l
                } else {
                    best
                }
            })
    }

    /// Iterate `(label, score)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (EmotionLabel, f32)> + '_ {
        EmotionLabel::ALL.iter().map(move |l| (*l, self.get(*l)))
    }
}

impl Default for EmotionVector {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Serialized as a `label -> score` map in canonical label order
impl Serialize for EmotionVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(NUM_EMOTIONS))?;
        for (label, score) in self.iter() {
            map.serialize_entry(label.name(), &score)?;
        }
        map.end()
    }
}

impl fmt::Display for EmotionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(l, s)| format!("{}={:.3}", l, s))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order() {
        let names: Vec<&str> = EmotionLabel::ALL.iter().map(|l| l.name()).collect();
        assert_eq!(
            names,
            ["happy", "angry", "sad", "afraid", "disgusted", "melancholic", "surprised", "calm"]
        );
        for (i, label) in EmotionLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
        }
    }

    #[test]
    fn test_from_token() {
        assert_eq!(EmotionLabel::from_token("低落"), Some(EmotionLabel::Melancholic));
        assert_eq!(EmotionLabel::from_token("sad"), None);
        assert_eq!(EmotionLabel::from_token(" 自然 "), Some(EmotionLabel::Calm));
        assert_eq!(EmotionLabel::from_token("bored"), None);
    }

    #[test]
    fn test_neutral() {
        let v = EmotionVector::neutral();
        assert_eq!(v.get(EmotionLabel::Calm), 1.0);
        assert_eq!(v.as_slice().iter().sum::<f32>(), 1.0);
        assert!(v.is_neutral());
    }

    #[test]
    fn test_clamping() {
        let v = EmotionVector::from_scores([2.0, -1.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(v.get(EmotionLabel::Happy), MAX_SCORE);
        assert_eq!(v.get(EmotionLabel::Angry), 0.0);
        assert_eq!(v.get(EmotionLabel::Sad), 0.5);
        assert_eq!(v.get(EmotionLabel::Calm), 0.0);
    }

    #[test]
    fn test_all_zero_forces_calm() {
        let v = EmotionVector::from_scores([0.0, -0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(v.is_neutral());
    }

    #[test]
    fn test_calm_only_forced_to_one() {
        let v = EmotionVector::from_scores([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.4]);
        assert_eq!(v.get(EmotionLabel::Calm), 1.0);
    }

    #[test]
    fn test_nan_is_no_signal() {
        let v = EmotionVector::from_scores([f32::NAN, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(v.is_neutral());
    }

    #[test]
    fn test_dominant() {
        let v = EmotionVector::from_scores([0.1, 0.0, 0.0, 0.9, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(v.dominant(), EmotionLabel::Afraid);
        assert_eq!(EmotionVector::neutral().dominant(), EmotionLabel::Calm);
    }

    #[test]
    fn test_serialize_as_map() {
        let json = serde_json::to_value(EmotionVector::neutral()).unwrap();
        assert_eq!(json["calm"], 1.0);
        assert_eq!(json["happy"], 0.0);
    }

    #[test]
    fn test_serialize_in_label_order() {
        let json = serde_json::to_string(&EmotionVector::neutral()).unwrap();
        let keys: Vec<usize> = EmotionLabel::ALL
            .iter()
            .map(|l| json.find(&format!("\"{}\"", l.name())).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(json.ends_with(r#""calm":1.0}"#));
    }
}
