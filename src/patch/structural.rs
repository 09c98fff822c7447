//! Structural (schema-aware) three-way patches.
//!
//! The patch format extends the merge patch:
//!
//! - keyed lists carry element patches. Each element names its key fields and
//!   the fields that changed; `{"$patch": "delete", <keys>}` removes an
//!   element. Elements not mentioned are left alone.
//! - set lists carry the values to add; values to remove are listed under the
//!   sibling key `$deleteFromPrimitiveList/<field>`.
//! - atomic lists and maps are replaced wholesale, like in a merge patch.
//!
//! With an original (previously applied) document the patch carries only the
//! caller's own changes, `original -> desired`, minus whatever the live object
//! already reflects. Fields the caller never changed are not touched, so edits
//! made by others on the live object survive. Without an original the patch is
//! `live -> desired`; keys missing from desired are deleted, but keyed-list
//! elements and set values missing from desired are kept, since nothing shows
//! the caller ever owned them.

use super::merge::expect_map;
use crate::error::PatchError;
use crate::object::{decode, encode};
use crate::schema::{Map as SchemaMap, PatchMeta, Shape, TypeRef};
use crate::value::{Field, FieldList, Map, Value};
use std::collections::{HashMap, HashSet};

/// Directive key marking a keyed-list element patch.
pub const PATCH_DIRECTIVE: &str = "$patch";
/// Directive value deleting a keyed-list element.
pub const DELETE_DIRECTIVE: &str = "delete";
/// Prefix of the sibling key listing values removed from a set list.
pub const DELETE_FROM_PRIMITIVE_LIST: &str = "$deleteFromPrimitiveList/";

/// Computes a structural patch between encoded documents.
///
/// `original` is the previously applied document, if known. Documents that
/// need no change produce `{}`.
pub fn create_structural_patch(
    live: &[u8],
    desired: &[u8],
    original: Option<&[u8]>,
    meta: &PatchMeta,
) -> Result<Vec<u8>, PatchError> {
    let live = decode(live)?;
    let desired = decode(desired)?;
    let original = original.map(decode).transpose()?;
    let patch = structural_patch_values(&live, &desired, original.as_ref(), meta)?;
    Ok(encode(&patch)?)
}

/// Computes a structural patch between documents.
pub fn structural_patch_values(
    live: &Value,
    desired: &Value,
    original: Option<&Value>,
    meta: &PatchMeta,
) -> Result<Value, PatchError> {
    let live = expect_map(live, "live")?;
    let desired = expect_map(desired, "desired")?;
    let root = root_struct(meta);

    let patch = match original {
        Some(original) => {
            let original = expect_map(original, "original")?;
            let differ = Differ {
                meta,
                delete_elements: true,
            };
            let intent = differ.diff_map(original, desired, &root);
            differ.prune_map(&intent, live, desired, &root)
        }
        None => Differ {
            meta,
            delete_elements: false,
        }
        .diff_map(live, desired, &root),
    };

    Ok(Value::Map(patch))
}

/// Applies a structural patch to an encoded document.
pub fn apply_structural_patch_bytes(
    target: &[u8],
    patch: &[u8],
    meta: &PatchMeta,
) -> Result<Vec<u8>, PatchError> {
    let target = decode(target)?;
    let patch = decode(patch)?;
    Ok(encode(&apply_structural_patch(&target, &patch, meta))?)
}

/// Applies a structural patch to a document.
pub fn apply_structural_patch(target: &Value, patch: &Value, meta: &PatchMeta) -> Value {
    match (target, patch) {
        (Value::Map(target), Value::Map(patch)) => {
            Value::Map(apply_map(target, patch, &root_struct(meta), meta))
        }
        (_, patch) => materialize(patch),
    }
}

// An unresolvable or non-map root still merges top-level keys; nested values
// are then atomic.
fn root_struct(meta: &PatchMeta) -> SchemaMap {
    match meta.shape(meta.root(), &Value::Map(Map::new())) {
        Shape::Struct(map) => map,
        _ => SchemaMap::default(),
    }
}

struct Differ<'m> {
    meta: &'m PatchMeta,
    /// Emit deletions of keyed-list elements and set values.
    delete_elements: bool,
}

impl Differ<'_> {
    fn diff_map(&self, from: &Map, to: &Map, schema: &SchemaMap) -> Map {
        let mut patch = Map::new();

        for (key, _) in from.iter() {
            if !to.has(key) {
                patch.set(key.clone(), Value::Null);
            }
        }

        for (key, to_value) in to.iter() {
            match from.get(key) {
                None => patch.set(key.clone(), to_value.clone()),
                Some(from_value) => {
                    self.diff_field(&mut patch, key, from_value, to_value, schema.field_type(key))
                }
            }
        }

        patch
    }

    fn diff_field(&self, patch: &mut Map, key: &str, from: &Value, to: &Value, tr: &TypeRef) {
        if from == to {
            return;
        }

        match (self.meta.shape(tr, to), from, to) {
            (Shape::Struct(schema), Value::Map(from), Value::Map(to)) => {
                let nested = self.diff_map(from, to, &schema);
                if !nested.is_empty() {
                    patch.set(key.to_string(), Value::Map(nested));
                }
            }
            (Shape::KeyedList { keys, element }, Value::List(from), Value::List(to)) => {
                match self.diff_keyed_list(from, to, &keys, &element) {
                    Some(items) if items.is_empty() => {}
                    Some(items) => patch.set(key.to_string(), Value::List(items)),
                    // Elements without keys can't be matched up.
                    None => patch.set(key.to_string(), Value::List(to.clone())),
                }
            }
            (Shape::SetList, Value::List(from), Value::List(to)) => {
                let added = missing_from(to, from);
                if !added.is_empty() {
                    patch.set(key.to_string(), Value::List(added));
                }
                if self.delete_elements {
                    let removed = missing_from(from, to);
                    if !removed.is_empty() {
                        patch.set(
                            format!("{}{}", DELETE_FROM_PRIMITIVE_LIST, key),
                            Value::List(removed),
                        );
                    }
                }
            }
            _ => patch.set(key.to_string(), to.clone()),
        }
    }

    fn diff_keyed_list(
        &self,
        from: &[Value],
        to: &[Value],
        keys: &[String],
        element: &TypeRef,
    ) -> Option<Vec<Value>> {
        let from_items = index_by_key(from, keys)?;
        let to_items = keyed_items(to, keys)?;
        let mut items = Vec::new();

        for (key, to_item) in &to_items {
            let Some(from_item) = from_items.get(key) else {
                items.push((*to_item).clone());
                continue;
            };
            match (self.meta.shape(element, to_item), from_item, to_item) {
                (Shape::Struct(schema), Value::Map(from_map), Value::Map(to_map)) => {
                    let nested = self.diff_map(from_map, to_map, &schema);
                    if !nested.is_empty() {
                        items.push(Value::Map(with_key_fields(nested, key)));
                    }
                }
                _ if from_item != to_item => items.push((*to_item).clone()),
                _ => {}
            }
        }

        if self.delete_elements {
            let to_keys: HashSet<&FieldList> = to_items.iter().map(|(k, _)| k).collect();
            for (key, _) in keyed_items(from, keys)? {
                if !to_keys.contains(&key) {
                    items.push(deletion_marker(&key));
                }
            }
        }

        Some(items)
    }

    /// Drops the parts of `patch` that `live` already satisfies.
    ///
    /// `desired` is the definition `patch` was computed toward. Where a keyed
    /// list can't be matched up element by element, its full desired value is
    /// sent instead of the element patches.
    fn prune_map(&self, patch: &Map, live: &Map, desired: &Map, schema: &SchemaMap) -> Map {
        let mut pruned = Map::new();

        for (key, patch_value) in patch.iter() {
            if let Some(field) = key.strip_prefix(DELETE_FROM_PRIMITIVE_LIST) {
                let live_values = live.get(field).and_then(Value::as_list);
                let present: Vec<Value> = patch_value
                    .as_list()
                    .into_iter()
                    .flatten()
                    .filter(|v| live_values.is_some_and(|l| l.contains(v)))
                    .cloned()
                    .collect();
                if !present.is_empty() {
                    pruned.set(key.clone(), Value::List(present));
                }
                continue;
            }

            let Some(live_value) = live.get(key) else {
                if !patch_value.is_null() {
                    pruned.set(key.clone(), patch_value.clone());
                }
                continue;
            };
            if patch_value.is_null() {
                pruned.set(key.clone(), Value::Null);
                continue;
            }

            let tr = schema.field_type(key);
            match (self.meta.shape(tr, patch_value), patch_value, live_value) {
                (Shape::Struct(nested_schema), Value::Map(p), Value::Map(l)) => {
                    let d = desired.get(key).and_then(Value::as_map).unwrap_or(p);
                    let nested = self.prune_map(p, l, d, &nested_schema);
                    if !nested.is_empty() {
                        pruned.set(key.clone(), Value::Map(nested));
                    }
                }
                (Shape::KeyedList { keys, element }, Value::List(p), Value::List(l)) => {
                    let full = desired.get(key).unwrap_or(patch_value);
                    let d = full.as_list().map(Vec::as_slice).unwrap_or(p.as_slice());
                    match self.prune_keyed_list(p, l, d, &keys, &element) {
                        Some(items) if items.is_empty() => {}
                        Some(items) => pruned.set(key.clone(), Value::List(items)),
                        None if full != live_value => pruned.set(key.clone(), full.clone()),
                        None => {}
                    }
                }
                (Shape::SetList, Value::List(p), Value::List(l)) => {
                    let added = missing_from(p, l);
                    if !added.is_empty() {
                        pruned.set(key.clone(), Value::List(added));
                    }
                }
                _ if patch_value != live_value => pruned.set(key.clone(), patch_value.clone()),
                _ => {}
            }
        }

        pruned
    }

    fn prune_keyed_list(
        &self,
        patch: &[Value],
        live: &[Value],
        desired: &[Value],
        keys: &[String],
        element: &TypeRef,
    ) -> Option<Vec<Value>> {
        let live_items = index_by_key(live, keys)?;
        let desired_items = index_by_key(desired, keys)?;
        let mut items = Vec::new();

        for (key, item) in keyed_items(patch, keys)? {
            let live_item = live_items.get(&key);
            if is_deletion(item) {
                if live_item.is_some() {
                    items.push(item.clone());
                }
                continue;
            }
            // An element missing from live is added whole, even when the
            // intent only holds its changed fields.
            let Some(live_item) = live_item else {
                items.push(desired_items.get(&key).copied().unwrap_or(item).clone());
                continue;
            };
            match (self.meta.shape(element, item), item, live_item) {
                (Shape::Struct(schema), Value::Map(p), Value::Map(l)) => {
                    let d = desired_items
                        .get(&key)
                        .and_then(|v| v.as_map())
                        .unwrap_or(p);
                    let nested = self.prune_map(p, l, d, &schema);
                    if !nested.is_empty() {
                        items.push(Value::Map(with_key_fields(nested, &key)));
                    }
                }
                _ if item != *live_item => items.push(item.clone()),
                _ => {}
            }
        }

        Some(items)
    }
}

fn apply_map(target: &Map, patch: &Map, schema: &SchemaMap, meta: &PatchMeta) -> Map {
    let mut result = target.clone();

    for (key, patch_value) in patch.iter() {
        let Some(field) = key.strip_prefix(DELETE_FROM_PRIMITIVE_LIST) else {
            continue;
        };
        if let (Some(Value::List(values)), Some(removed)) =
            (result.fields.get_mut(field), patch_value.as_list())
        {
            values.retain(|v| !removed.contains(v));
        }
    }

    for (key, patch_value) in patch.iter() {
        if key.starts_with(DELETE_FROM_PRIMITIVE_LIST) {
            continue;
        }
        if patch_value.is_null() {
            result.delete(key);
            continue;
        }
        let merged = match result.get(key) {
            Some(current) => apply_field(current, patch_value, schema.field_type(key), meta),
            None => materialize(patch_value),
        };
        result.set(key.clone(), merged);
    }

    result
}

fn apply_field(current: &Value, patch: &Value, tr: &TypeRef, meta: &PatchMeta) -> Value {
    match (meta.shape(tr, patch), current, patch) {
        (Shape::Struct(schema), Value::Map(c), Value::Map(p)) => {
            Value::Map(apply_map(c, p, &schema, meta))
        }
        (Shape::KeyedList { keys, element }, Value::List(c), Value::List(p)) => {
            match apply_keyed_list(c, p, &keys, &element, meta) {
                Some(items) => Value::List(items),
                None => materialize(patch),
            }
        }
        (Shape::SetList, Value::List(c), Value::List(p)) => {
            let mut items = c.clone();
            items.extend(missing_from(p, c));
            Value::List(items)
        }
        _ => materialize(patch),
    }
}

fn apply_keyed_list(
    current: &[Value],
    patch: &[Value],
    keys: &[String],
    element: &TypeRef,
    meta: &PatchMeta,
) -> Option<Vec<Value>> {
    let mut items: Vec<(FieldList, Value)> = keyed_items(current, keys)?
        .into_iter()
        .map(|(k, v)| (k, v.clone()))
        .collect();

    for (key, item) in keyed_items(patch, keys)? {
        let position = items.iter().position(|(k, _)| *k == key);
        match position {
            Some(i) if is_deletion(item) => {
                items.remove(i);
            }
            None if is_deletion(item) => {}
            Some(i) => {
                let merged = apply_field(&items[i].1, &strip_directive(item), element, meta);
                items[i].1 = merged;
            }
            None => items.push((key, materialize(item))),
        }
    }

    Some(items.into_iter().map(|(_, v)| v).collect())
}

/// Turns a patch fragment into the value it stands for when there is nothing
/// to merge it into: nulls and directives disappear.
fn materialize(patch: &Value) -> Value {
    match patch {
        Value::Map(map) => Value::Map(
            map.iter()
                .filter(|(k, v)| !v.is_null() && !k.starts_with('$'))
                .map(|(k, v)| (k.clone(), materialize(v)))
                .collect(),
        ),
        Value::List(items) => Value::List(
            items
                .iter()
                .filter(|item| !is_deletion(item))
                .map(materialize)
                .collect(),
        ),
        other => other.clone(),
    }
}

fn strip_directive(item: &Value) -> Value {
    match item {
        Value::Map(map) if map.has(PATCH_DIRECTIVE) => {
            let mut map = map.clone();
            map.delete(PATCH_DIRECTIVE);
            Value::Map(map)
        }
        other => other.clone(),
    }
}

fn is_deletion(item: &Value) -> bool {
    item.get_path(&[PATCH_DIRECTIVE]).and_then(Value::as_str) == Some(DELETE_DIRECTIVE)
}

fn deletion_marker(key: &FieldList) -> Value {
    let mut marker = with_key_fields(Map::new(), key);
    marker.set(
        PATCH_DIRECTIVE.to_string(),
        Value::String(DELETE_DIRECTIVE.to_string()),
    );
    Value::Map(marker)
}

fn with_key_fields(mut map: Map, key: &FieldList) -> Map {
    for field in key.iter() {
        map.set(field.name.clone(), field.value.clone());
    }
    map
}

/// Extracts the key of a keyed-list element. Elements that are not maps,
/// lack a key field, or have a NaN or infinite key value have no key.
fn item_key(item: &Value, keys: &[String]) -> Option<FieldList> {
    let map = item.as_map()?;
    let fields = keys
        .iter()
        .map(|name| match map.get(name)? {
            Value::Float(f) if !f.is_finite() => None,
            value => Some(Field {
                name: name.clone(),
                value: value.clone(),
            }),
        })
        .collect::<Option<Vec<_>>>()?;
    Some(FieldList::with_fields(fields))
}

fn keyed_items<'v>(items: &'v [Value], keys: &[String]) -> Option<Vec<(FieldList, &'v Value)>> {
    items
        .iter()
        .map(|item| item_key(item, keys).map(|key| (key, item)))
        .collect()
}

fn index_by_key<'v>(items: &'v [Value], keys: &[String]) -> Option<HashMap<FieldList, &'v Value>> {
    Some(keyed_items(items, keys)?.into_iter().collect())
}

/// Values of `items` not in `other`, in order, without duplicates.
fn missing_from(items: &[Value], other: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !other.contains(item) && !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
