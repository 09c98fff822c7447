//! Error types for patch computation and reconciliation.

use crate::object::ObjectKey;
use crate::reconcile::ClientError;
use std::fmt;
use thiserror::Error;

/// A document could not be encoded or decoded.
///
/// Malformed documents are never retried.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("non-finite number at {path}")]
    NonFiniteFloat { path: String },

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("missing required field {field}")]
    MissingField { field: &'static str },
}

/// A patch could not be computed.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("{document} document must be an object, got {actual}")]
    NotAnObject {
        document: &'static str,
        actual: &'static str,
    },
}

/// The step of a reconciliation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Create,
    Diff,
    Patch,
    Refresh,
    Delete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Create => "create",
            Stage::Diff => "create patch",
            Stage::Patch => "patch",
            Stage::Refresh => "refresh",
            Stage::Delete => "delete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reconciliation failed.
///
/// Every variant names the object and the stage that failed. The engine
/// never retries; [`ReconcileError::is_retryable`] tells the caller whether a
/// retry can succeed.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to {stage} {key}: {source}")]
    Serialization {
        key: ObjectKey,
        stage: Stage,
        #[source]
        source: PatchError,
    },

    #[error("failed to {stage} {key}: conflict: {message}")]
    PatchConflict {
        key: ObjectKey,
        stage: Stage,
        message: String,
    },

    #[error("failed to {stage} {key}: {message}")]
    Transport {
        key: ObjectKey,
        stage: Stage,
        message: String,
    },

    #[error("failed to {stage} {key}: not found")]
    NotFound { key: ObjectKey, stage: Stage },

    #[error("failed to {stage} {key}: already exists")]
    AlreadyExists { key: ObjectKey, stage: Stage },
}

impl ReconcileError {
    /// Wraps a collaborator error with the object and stage it occurred at.
    pub fn from_client(key: &ObjectKey, stage: Stage, err: ClientError) -> Self {
        let key = key.clone();
        match err {
            ClientError::NotFound => ReconcileError::NotFound { key, stage },
            ClientError::AlreadyExists => ReconcileError::AlreadyExists { key, stage },
            ClientError::Conflict(message) => ReconcileError::PatchConflict {
                key,
                stage,
                message,
            },
            ClientError::Transport(message) => ReconcileError::Transport {
                key,
                stage,
                message,
            },
        }
    }

    /// Wraps a patch computation error.
    pub fn from_patch(key: &ObjectKey, stage: Stage, err: PatchError) -> Self {
        ReconcileError::Serialization {
            key: key.clone(),
            stage,
            source: err,
        }
    }

    pub fn key(&self) -> &ObjectKey {
        match self {
            ReconcileError::Serialization { key, .. }
            | ReconcileError::PatchConflict { key, .. }
            | ReconcileError::Transport { key, .. }
            | ReconcileError::NotFound { key, .. }
            | ReconcileError::AlreadyExists { key, .. } => key,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ReconcileError::Serialization { stage, .. }
            | ReconcileError::PatchConflict { stage, .. }
            | ReconcileError::Transport { stage, .. }
            | ReconcileError::NotFound { stage, .. }
            | ReconcileError::AlreadyExists { stage, .. } => *stage,
        }
    }

    /// Returns true for version conflicts and transport failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::PatchConflict { .. } | ReconcileError::Transport { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconcileError::NotFound { .. })
    }
}
