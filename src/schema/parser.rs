//! Parser for loading schemas from YAML.

use super::elements::{Schema, TypeRef};
use super::meta::PatchMeta;
use thiserror::Error;

/// Parser holds a schema parsed from YAML and hands out per-type metadata.
#[derive(Debug, Clone)]
pub struct Parser {
    pub schema: Schema,
}

/// Error returned when a schema document cannot be parsed.
#[derive(Debug, Error)]
#[error("failed to parse schema: {0}")]
pub struct SchemaError(#[from] serde_yaml::Error);

impl Parser {
    /// Creates a new parser from a YAML schema string.
    pub fn new(schema_yaml: &str) -> Result<Parser, SchemaError> {
        let schema: Schema = serde_yaml::from_str(schema_yaml)?;
        Ok(Parser { schema })
    }

    /// Returns the list of type names in this schema.
    pub fn type_names(&self) -> Vec<&str> {
        self.schema.types.iter().map(|t| t.name.as_str()).collect()
    }

    /// Returns the merge metadata rooted at the named type.
    ///
    /// The name is not checked; see [`PatchMeta::is_resolvable`].
    pub fn patch_meta(&self, type_name: &str) -> PatchMeta {
        PatchMeta::new(self.schema.clone(), TypeRef::named(type_name))
    }
}
