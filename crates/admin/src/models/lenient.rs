//! Forgiving field readers for documents written by many hands.
//!
//! Records in the store were created by different screens and scripts, so
//! the same field may be a string in one document and a number in another,
//! or missing entirely. Readers here never fail: an unusable value is `None`.

use std::str::FromStr;

use serde_json::Value;

use crate::backend::Fields;

/// Non-empty text. Numbers and booleans are rendered as text.
pub fn text(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-negative whole count. Negative values clamp to zero, fractions floor.
pub fn count(fields: &Fields, key: &str) -> Option<u32> {
    let value = match fields.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !value.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to u32 range
    let clamped = value.floor().clamp(0.0, f64::from(u32::MAX)) as u32;
    Some(clamped)
}

/// Text parsed with `FromStr`; unknown values are `None`.
pub fn parsed<T: FromStr>(fields: &Fields, key: &str) -> Option<T> {
    text(fields, key)?.parse().ok()
}
