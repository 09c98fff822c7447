//! Generic merge patches.
//!
//! A merge patch lists only changed keys. A `null` value deletes a key, nested
//! maps are patched recursively, and every other value (lists included)
//! replaces the previous one wholesale.

use crate::error::PatchError;
use crate::object::{decode, encode};
use crate::value::{Map, Value};

/// Computes the merge patch that turns `old` into `new`.
///
/// Both arguments are encoded documents. Equal documents produce `{}`.
pub fn create_merge_patch(old: &[u8], new: &[u8]) -> Result<Vec<u8>, PatchError> {
    let old = decode(old)?;
    let new = decode(new)?;
    let patch = merge_patch_values(&old, &new)?;
    Ok(encode(&patch)?)
}

/// Computes the merge patch that turns `old` into `new`.
pub fn merge_patch_values(old: &Value, new: &Value) -> Result<Value, PatchError> {
    let old = expect_map(old, "old")?;
    let new = expect_map(new, "new")?;
    Ok(Value::Map(diff_maps(old, new)))
}

pub(crate) fn expect_map<'v>(value: &'v Value, document: &'static str) -> Result<&'v Map, PatchError> {
    value.as_map().ok_or(PatchError::NotAnObject {
        document,
        actual: value.type_name(),
    })
}

fn diff_maps(old: &Map, new: &Map) -> Map {
    let mut patch = Map::new();

    for (key, _) in old.iter() {
        if !new.has(key) {
            patch.set(key.clone(), Value::Null);
        }
    }

    for (key, new_value) in new.iter() {
        match old.get(key) {
            None => patch.set(key.clone(), new_value.clone()),
            Some(Value::Map(old_map)) if new_value.is_map() => {
                if let Value::Map(new_map) = new_value {
                    let nested = diff_maps(old_map, new_map);
                    if !nested.is_empty() {
                        patch.set(key.clone(), Value::Map(nested));
                    }
                }
            }
            Some(old_value) if old_value != new_value => {
                patch.set(key.clone(), new_value.clone());
            }
            Some(_) => {}
        }
    }

    patch
}

/// Applies a merge patch to an encoded document.
pub fn apply_merge_patch_bytes(target: &[u8], patch: &[u8]) -> Result<Vec<u8>, PatchError> {
    let target = decode(target)?;
    let patch = decode(patch)?;
    Ok(encode(&apply_merge_patch(&target, &patch))?)
}

/// Applies a merge patch to a document.
///
/// A patch that is not a map replaces the target.
pub fn apply_merge_patch(target: &Value, patch: &Value) -> Value {
    let Value::Map(patch) = patch else {
        return patch.clone();
    };

    let mut result = match target {
        Value::Map(map) => map.clone(),
        _ => Map::new(),
    };

    for (key, patch_value) in patch.iter() {
        if patch_value.is_null() {
            result.delete(key);
            continue;
        }
        let current = result.get(key).cloned().unwrap_or_default();
        result.set(key.clone(), apply_merge_patch(&current, patch_value));
    }

    Value::Map(result)
}
