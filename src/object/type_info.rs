//! Type capabilities reported by the collaborator.

use crate::schema::PatchMeta;

/// Whether a kind has a compiled schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// The kind has a schema with field-merge metadata.
    Structured,
    /// The kind's shape is not known ahead of time.
    Unstructured,
}

/// TypeInfo describes a kind as far as patching is concerned.
///
/// The engine never inspects objects to work this out; the collaborator says
/// what it knows.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub kind: TypeKind,
    /// Set for schema-extension objects (e.g. custom resource definitions).
    /// They may carry a schema, but list-merge-by-key is not safe on them.
    pub extension: bool,
    /// Field-merge metadata; only meaningful for structured kinds.
    pub meta: Option<PatchMeta>,
}

impl TypeInfo {
    pub fn structured(meta: PatchMeta) -> Self {
        TypeInfo {
            kind: TypeKind::Structured,
            extension: false,
            meta: Some(meta),
        }
    }

    pub fn unstructured() -> Self {
        TypeInfo {
            kind: TypeKind::Unstructured,
            extension: false,
            meta: None,
        }
    }

    /// A structured schema-extension kind.
    pub fn extension(meta: Option<PatchMeta>) -> Self {
        TypeInfo {
            kind: TypeKind::Structured,
            extension: true,
            meta,
        }
    }

    /// Removes the merge metadata, keeping the kind as reported.
    pub fn without_meta(mut self) -> Self {
        self.meta = None;
        self
    }
}
