//! Canonical encoding of documents.
//!
//! Map keys are always written in sorted order, so logically identical
//! documents encode to identical bytes. Diffing and no-op detection rely on
//! this.

use crate::error::SerializationError;
use crate::value::Value;

/// Encodes a document as canonical JSON.
pub fn encode(value: &Value) -> Result<Vec<u8>, SerializationError> {
    check_finite(value, &mut String::new())?;
    Ok(serde_json::to_vec(value)?)
}

/// Decodes a JSON document.
pub fn decode(bytes: &[u8]) -> Result<Value, SerializationError> {
    Ok(serde_json::from_slice(bytes)?)
}

// JSON has no encoding for NaN or infinities.
fn check_finite(value: &Value, path: &mut String) -> Result<(), SerializationError> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(SerializationError::NonFiniteFloat {
            path: if path.is_empty() {
                ".".to_string()
            } else {
                path.clone()
            },
        }),
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{}]", i));
                check_finite(item, path)?;
                path.truncate(len);
            }
            Ok(())
        }
        Value::Map(map) => {
            for (key, item) in map.iter() {
                let len = path.len();
                path.push('.');
                path.push_str(key);
                check_finite(item, path)?;
                path.truncate(len);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
