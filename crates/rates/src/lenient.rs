//! Tolerant deserializers for upstream cart and rate-table data.
//!
//! Numbers may arrive as numbers, numeric strings, blanks or garbage.
//! Anything that is not a finite, non-negative number becomes 0.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl NumberLike {
    fn value(self) -> f64 {
        let raw = match self {
            NumberLike::Number(n) => n,
            NumberLike::Text(s) => s.trim().parse().unwrap_or(0.0),
            NumberLike::Other(_) => 0.0,
        };
        non_negative(raw)
    }
}

/// Clamp to a finite, non-negative value.
#[inline]
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Deserialize an `f64`, normalising malformed input to 0.
pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(NumberLike::deserialize(deserializer)?.value())
}

/// Deserialize a count, truncating fractions and normalising malformed
/// input to 0.
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = NumberLike::deserialize(deserializer)?.value();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(value.min(f64::from(u32::MAX)) as u32)
}

/// Deserialize an identifier (product or shipping class id).
pub fn id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = NumberLike::deserialize(deserializer)?.value();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(value as u64)
}

/// Deserialize a string, mapping numbers to their text and anything else to "".
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
