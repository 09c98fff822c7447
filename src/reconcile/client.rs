//! The remote store as seen by the reconciler.

use crate::object::{ManagedObject, ObjectKey, TypeInfo};
use crate::patch::PatchKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a [`ResourceClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    /// The store rejected a write based on a stale read.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Transport(String),
}

/// How dependents of a deleted object are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropagationPolicy {
    /// Dependents are left in place.
    Orphan,
    /// The object goes away at once; dependents are removed afterwards.
    #[default]
    Background,
    /// The object stays until its dependents are gone.
    Foreground,
}

/// ResourceClient reads and writes objects in the remote store.
///
/// Calls are synchronous and each one is a single round trip; the reconciler
/// never retries them.
pub trait ResourceClient {
    /// Fetches the live object. A missing object is [`ClientError::NotFound`].
    fn get(&self, key: &ObjectKey) -> Result<ManagedObject, ClientError>;

    /// Creates `object` in `namespace` and returns it as stored.
    fn create(&self, namespace: &str, object: &ManagedObject) -> Result<ManagedObject, ClientError>;

    /// Sends a patch payload and returns the patched object.
    fn patch(
        &self,
        key: &ObjectKey,
        kind: PatchKind,
        patch: &[u8],
    ) -> Result<ManagedObject, ClientError>;

    fn delete(&self, key: &ObjectKey, policy: PropagationPolicy) -> Result<(), ClientError>;

    /// Describes how objects of `kind` may be patched.
    fn type_info(&self, kind: &str) -> TypeInfo;
}
