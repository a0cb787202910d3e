//! Tolerant deserializers for provider payloads that send numeric fields
//! as either JSON numbers or strings.

use serde::de::{Deserializer, Error};
use serde::Deserialize;
use serde_json::Value;

/// Deserialize a string or number into a `String`, preserving the textual
/// form (leading zeros in provider codes must survive)
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Optional variant of [`string_or_number`]. Use with `#[serde(default)]`.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
