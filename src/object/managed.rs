//! ManagedObject and ObjectKey.

use super::serialize;
use crate::error::SerializationError;
use crate::value::Value;
use std::fmt;

/// ObjectKey identifies one object in the remote store.
///
/// The namespace is empty for cluster-scoped kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        ObjectKey {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{} {}", self.kind, self.name)
        } else {
            write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// ManagedObject is one resource instance: its key and its raw document.
///
/// Instances are plain request/response values; nothing caches them.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    key: ObjectKey,
    document: Value,
}

const RESOURCE_VERSION: [&str; 2] = ["metadata", "resourceVersion"];

impl ManagedObject {
    /// Creates an object from an explicit key and document.
    pub fn new(key: ObjectKey, document: Value) -> Self {
        ManagedObject { key, document }
    }

    /// Creates an object whose key is read from the document's `kind`,
    /// `metadata.namespace` and `metadata.name`.
    pub fn from_document(document: Value) -> Result<Self, SerializationError> {
        let kind = document
            .get_path(&["kind"])
            .and_then(Value::as_str)
            .ok_or(SerializationError::MissingField { field: "kind" })?;
        let name = document
            .get_path(&["metadata", "name"])
            .and_then(Value::as_str)
            .ok_or(SerializationError::MissingField {
                field: "metadata.name",
            })?;
        let namespace = document
            .get_path(&["metadata", "namespace"])
            .and_then(Value::as_str)
            .unwrap_or_default();

        let key = ObjectKey::new(kind, namespace, name);
        Ok(ManagedObject { key, document })
    }

    /// Decodes a JSON document into an object.
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        Self::from_document(serialize::decode(json.as_bytes())?)
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn kind(&self) -> &str {
        &self.key.kind
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Value {
        &mut self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }

    /// Returns the optimistic-concurrency token, if the store assigned one.
    pub fn resource_version(&self) -> Option<&str> {
        self.document
            .get_path(&RESOURCE_VERSION)
            .and_then(Value::as_str)
    }

    pub fn set_resource_version(&mut self, version: impl Into<String>) {
        self.document
            .set_path(&RESOURCE_VERSION, Value::String(version.into()));
    }

    /// Encodes the document canonically.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        serialize::encode(&self.document)
    }
}
