//! Lenient numeric handling for Nightscout documents.
//!
//! Nightscout stores whatever the uploader sent, so the same field can arrive as
//! `5`, `5.0`, `"5"` or `"abc"` depending on the client that wrote it.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interprets a JSON value as a number, accepting numeric strings.
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Like [`value_as_f64`], but logs when a present value had to be discarded.
pub(crate) fn field_as_f64(field: &str, value: Option<&Value>) -> Option<f64> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    let parsed = value_as_f64(value);
    if parsed.is_none() {
        tracing::warn!(field, %value, "ignoring non-numeric field");
    }
    parsed
}

/// Serde adapter for optional numbers that may be encoded as strings.
///
/// Unparsable values become `None` instead of failing the whole document.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(field_as_f64("value", raw.as_ref()))
}
