//! Patch module - Computing the delta that moves a live object toward its
//! desired definition.
//!
//! Two generators exist: a generic merge patch that treats every list as an
//! atomic value, and a structural three-way patch that merges keyed lists
//! element by element using [`PatchMeta`](crate::schema::PatchMeta). The
//! strategy selector picks one based on [`TypeInfo`](crate::object::TypeInfo).

mod merge;
mod strategy;
mod structural;

#[cfg(test)]
mod structural_test;

pub use merge::*;
pub use strategy::*;
pub use structural::*;

use std::fmt;

/// The encoding of a patch payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
    /// Generic JSON merge patch; lists are replaced wholesale.
    MergePatch,
    /// Schema-aware patch; keyed lists are merged element-wise.
    StructuralMergePatch,
    /// The complete desired document.
    FullReplace,
}

impl PatchKind {
    /// Returns the media type a store expects for this kind of payload.
    pub fn content_type(&self) -> &'static str {
        match self {
            PatchKind::MergePatch => "application/merge-patch+json",
            PatchKind::StructuralMergePatch => "application/strategic-merge-patch+json",
            PatchKind::FullReplace => "application/json",
        }
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatchKind::MergePatch => "merge",
            PatchKind::StructuralMergePatch => "structural merge",
            PatchKind::FullReplace => "full replace",
        };
        f.write_str(name)
    }
}

/// A patch payload together with its encoding.
///
/// A patch lives only for the duration of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub kind: PatchKind,
    pub bytes: Vec<u8>,
}

impl Patch {
    pub fn new(kind: PatchKind, bytes: Vec<u8>) -> Self {
        Patch { kind, bytes }
    }

    /// Returns the payload as text, for logging.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or("<binary>")
    }
}

/// The result of diffing a desired object against a live one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchDecision {
    /// The live object already converged; nothing to send.
    NoOp,
    /// The live object needs this patch.
    Apply(Patch),
}

impl PatchDecision {
    pub fn is_noop(&self) -> bool {
        matches!(self, PatchDecision::NoOp)
    }

    pub fn patch(&self) -> Option<&Patch> {
        match self {
            PatchDecision::NoOp => None,
            PatchDecision::Apply(patch) => Some(patch),
        }
    }
}

/// The payload of a patch that changes nothing.
pub(crate) const EMPTY_PATCH: &[u8] = b"{}";
