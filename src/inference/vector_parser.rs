//! Parsing of the explicit `emotion_vector` request parameter
//!
//! Accepts a JSON array (`[0.1, 0.2, ...]`) or comma separated numbers.
//! No clamping or length check happens here.

use crate::error::{EmotionError, EmotionResult};

/// Parse a raw emotion vector string
///
/// Returns `Ok(None)` when nothing was supplied: a missing or blank input, an
/// empty JSON array, or only separators.
pub fn parse_emotion_vector(raw: Option<&str>) -> EmotionResult<Option<Vec<f32>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let values = if raw.starts_with('[') {
        parse_json_array(raw)?
    } else {
        parse_comma_separated(raw)?
    };

    if values.is_empty() {
        Ok(None)
    } else {
        Ok(Some(values))
    }
}

fn parse_json_array(raw: &str) -> EmotionResult<Vec<f32>> {
    let items: Vec<serde_json::Value> = serde_json::from_str(raw)
        .map_err(|e| EmotionError::invalid_vector(format!("invalid JSON array: {}", e)))?;

    items
        .iter()
        .map(|item| match item {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(|v| v as f32)
                .ok_or_else(|| EmotionError::invalid_vector(format!("{} is not a float", n))),
            serde_json::Value::String(s) => parse_number(s),
            other => Err(EmotionError::invalid_vector(format!("{} is not a number", other))),
        })
        .collect()
}

fn parse_comma_separated(raw: &str) -> EmotionResult<Vec<f32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .map(parse_number)
        .collect()
}

fn parse_number(token: &str) -> EmotionResult<f32> {
    token
        .trim()
        .parse::<f32>()
        .map_err(|_| EmotionError::invalid_vector(format!("'{}' is not a number", token)))
}
