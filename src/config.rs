//! Engine configuration.

use crate::reconcile::PropagationPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fields written by the store rather than by callers. They are left out of
/// every diff.
pub const DEFAULT_IGNORED_FIELDS: &[&str] = &[
    "status",
    "metadata.resourceVersion",
    "metadata.uid",
    "metadata.creationTimestamp",
    "metadata.generation",
    "metadata.managedFields",
    "metadata.selfLink",
];

/// EngineConfig controls how patches are computed and applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Dotted paths removed from the desired, live and original documents
    /// before diffing.
    pub ignored_fields: Vec<String>,

    /// Send the whole desired document instead of a patch when the object
    /// has drifted.
    pub force: bool,

    /// Stamp the live resource version into patches so the store rejects
    /// writes based on a stale read.
    pub optimistic_lock: bool,

    /// How dependents are handled when an object is deleted.
    pub propagation_policy: PropagationPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ignored_fields: DEFAULT_IGNORED_FIELDS.iter().map(|f| f.to_string()).collect(),
            force: false,
            optimistic_lock: false,
            propagation_policy: PropagationPolicy::Background,
        }
    }
}

/// Error returned when a configuration document cannot be parsed.
#[derive(Debug, Error)]
#[error("invalid engine configuration: {0}")]
pub struct ConfigError(#[from] serde_yaml::Error);

impl EngineConfig {
    /// Parses a configuration from YAML. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Iterates over the ignored fields, split into path segments.
    pub(crate) fn ignored_paths(&self) -> impl Iterator<Item = Vec<&str>> {
        self.ignored_fields
            .iter()
            .filter(|f| !f.is_empty())
            .map(|f| f.split('.').collect())
    }
}
