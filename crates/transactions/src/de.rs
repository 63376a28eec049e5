//! Lenient field deserializers for backend payloads. The backend is not
//! consistent about `null` and about sending numbers as strings; none of the
//! fields using these are worth rejecting a record over.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reads an explicit `null` like a missing field.
///
/// # Errors
///
/// Fails if a non-null value does not deserialize as `T`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a number sent as either a JSON number or a numeric string.
/// Anything else reads as `None`.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Like [`lenient_f64`], for non-negative integers.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Reads a string, taking numbers and booleans in its place.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(value @ (Value::Number(_) | Value::Bool(_))) => Some(value.to_string()),
        _ => None,
    })
}
