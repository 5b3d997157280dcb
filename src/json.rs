//! JSON reading and writing policy.
//!
//! Responses can be deserialized whole or from a nested subtree selected by
//! a dotted result path (`"data.items"`). Request bodies are serialized with
//! null fields dropped. Both behaviors are controlled by [`JsonOptions`],
//! which the [`Client`](crate::Client) owns and passes to every call.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serializer/deserializer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOptions {
    /// Drop object fields holding `null` from request bodies.
    pub skip_null_fields: bool,
    /// Fall back to a case-insensitive key match when a result path segment
    /// has no exact match.
    pub case_insensitive_paths: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            skip_null_fields: true,
            case_insensitive_paths: true,
        }
    }
}

/// Deserializes `text`, or the subtree at `path`, into `T`.
///
/// # Errors
///
/// Returns [`Error::DeserializationFailed`] if the text is not JSON, a path
/// segment is missing or null, the selected value is null, or it does not
/// fit `T`.
///
/// # Examples
///
/// ```
/// use reqtry::json::{deserialize, JsonOptions};
///
/// let text = r#"{ "result": { "items": [1, 2, 3] } }"#;
/// let items: Vec<u32> = deserialize(text, "result.items", &JsonOptions::default()).unwrap();
/// assert_eq!(items, vec![1, 2, 3]);
///
/// assert!(deserialize::<Vec<u32>>(text, "result.missing", &JsonOptions::default()).is_err());
/// ```
pub fn deserialize<T: DeserializeOwned>(
    text: &str,
    path: &str,
    options: &JsonOptions,
) -> Result<T> {
    let root: Value = serde_json::from_str(text).map_err(|e| failed(e.to_string(), text))?;
    let selected = resolve(root, path, options).map_err(|message| failed(message, text))?;

    if selected.is_null() {
        return Err(failed("result is null".to_string(), text));
    }

    serde_json::from_value(selected).map_err(|e| {
        tracing::error!(
            error = %e,
            path = path,
            target = std::any::type_name::<T>(),
            "Failed to deserialize response"
        );
        failed(
            format!("cannot deserialize to {}: {}", std::any::type_name::<T>(), e),
            text,
        )
    })
}

/// Like [`deserialize`], but returns `None` on any failure.
pub fn try_deserialize<T: DeserializeOwned>(
    text: &str,
    path: &str,
    options: &JsonOptions,
) -> Option<T> {
    deserialize(text, path, options).ok()
}

/// Serializes a request body.
///
/// # Errors
///
/// Returns [`Error::SerializationFailed`] if `body` cannot be represented as JSON.
pub fn to_body<B: Serialize + ?Sized>(body: &B, options: &JsonOptions) -> Result<Vec<u8>> {
    let mut value =
        serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
    if options.skip_null_fields {
        strip_nulls(&mut value);
    }
    serde_json::to_vec(&value).map_err(|e| Error::SerializationFailed(e.to_string()))
}

fn resolve(root: Value, path: &str, options: &JsonOptions) -> std::result::Result<Value, String> {
    let path = path.trim();
    if path.is_empty() {
        return Ok(root);
    }

    let mut current = root;
    for segment in path.split('.') {
        let Value::Object(mut fields) = current else {
            return Err(format!("property '{}' not found: parent is not an object", segment));
        };

        let key = if fields.contains_key(segment) || !options.case_insensitive_paths {
            segment.to_string()
        } else {
            fields
                .keys()
                .find(|key| key.eq_ignore_ascii_case(segment))
                .cloned()
                .unwrap_or_else(|| segment.to_string())
        };

        current = match fields.remove(&key) {
            Some(Value::Null) => return Err(format!("property '{}' is null", segment)),
            Some(value) => value,
            None => return Err(format!("property '{}' not found", segment)),
        };
    }

    Ok(current)
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            fields.retain(|_, field| !field.is_null());
            fields.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

fn failed(message: String, text: &str) -> Error {
    Error::DeserializationFailed {
        message,
        raw_response: text.to_string(),
    }
}
