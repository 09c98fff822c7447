//! # Resource Apply
//!
//! Reconciles declarative resource definitions against a live control plane.
//!
//! For each desired object the engine reads the live copy and decides whether
//! to create it, leave it alone, or patch it. Patches are either generic JSON
//! merge patches or structural three-way patches that merge keyed lists
//! element by element and keep fields written by others.
//!
//! ## Modules
//!
//! - [`value`] - In-memory representation of JSON/YAML documents
//! - [`schema`] - Type schema language and per-kind field-merge metadata
//! - [`object`] - Resource instances, canonical encoding and type capabilities
//! - [`patch`] - Merge and structural patch generators and the strategy selector
//! - [`reconcile`] - The reconciler and the remote store trait
//! - [`config`] - Engine configuration
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod object;
pub mod patch;
pub mod reconcile;
pub mod schema;
pub mod value;

pub use config::EngineConfig;
pub use error::{PatchError, ReconcileError, SerializationError, Stage};
pub use object::{ManagedObject, ObjectKey, TypeInfo, TypeKind};
pub use patch::{Patch, PatchDecision, PatchKind};
pub use reconcile::{
    ClientError, PropagationPolicy, ReconcileOutcome, Reconciler, ReconcilerBuilder,
    ResourceClient,
};
pub use schema::{PatchMeta, Schema};
pub use value::Value;
