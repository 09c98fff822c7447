//! Core schema elements and type definitions.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Schema is a list of named types.
///
/// Schema types are indexed in a map before the first search so this type
/// should be considered immutable.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDef>,

    #[serde(skip)]
    type_map: OnceCell<HashMap<String, TypeDef>>,

    #[serde(skip)]
    resolved_types: Mutex<HashMap<TypeRefKey, Atom>>,
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        Schema::with_types(self.types.clone())
    }
}

/// Key for caching resolved type references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TypeRefKey {
    named_type: Option<String>,
    element_relationship: Option<ElementRelationship>,
}

impl From<&TypeRef> for TypeRefKey {
    fn from(tr: &TypeRef) -> Self {
        TypeRefKey {
            named_type: tr.named_type.clone(),
            element_relationship: tr.element_relationship,
        }
    }
}

/// TypeDef represents a named type in a schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDef {
    /// Top level types should be named. Every type must have a unique name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(flatten)]
    pub atom: Atom,
}

/// TypeRef either refers to a named type or declares an inlined type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Reference to named type in schema.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "namedType")]
    pub named_type: Option<String>,

    /// Inline type definition.
    #[serde(flatten)]
    pub inlined: Box<Atom>,

    /// If this reference refers to a map-type or list-type, this field overrides
    /// the `ElementRelationship` of the referred type when resolved.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "elementRelationship"
    )]
    pub element_relationship: Option<ElementRelationship>,
}

impl TypeRef {
    /// Creates a reference to a named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef {
            named_type: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Atom represents the smallest possible pieces of the type system.
/// Each set field in the Atom represents a possible type for the object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<List>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Map>,
}

/// Scalar (AKA "primitive") represents a type which has a single value which is
/// either numeric, string, or boolean, or untyped for any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Numeric,
    String,
    Boolean,
    Untyped,
}

/// ElementRelationship is an enum of the different possible relationships
/// between the elements of container types (maps, lists).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementRelationship {
    /// Associative only applies to lists. With keys, elements are merged by
    /// the values of the key fields; without keys, the list is a set of scalars.
    Associative,
    /// Atomic makes container types (lists, maps) behave as scalars / leaf fields.
    Atomic,
    /// Separable means the items of the container type have no particular
    /// relationship (default behavior for maps).
    #[default]
    Separable,
}

/// Map is either a struct with named fields or a string-keyed map whose
/// unknown keys share `element_type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Map {
    /// Each struct field appears exactly once in this list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<StructField>,

    /// ElementType is the type of the struct's unknown fields.
    #[serde(default, rename = "elementType")]
    pub element_type: TypeRef,

    /// ElementRelationship states the relationship between the map's items.
    #[serde(
        default,
        skip_serializing_if = "is_default_element_relationship",
        rename = "elementRelationship"
    )]
    pub element_relationship: ElementRelationship,

    #[serde(skip)]
    field_map: OnceCell<HashMap<String, StructField>>,
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.element_type == other.element_type
            && self.element_relationship == other.element_relationship
    }
}

fn is_default_element_relationship(er: &ElementRelationship) -> bool {
    *er == ElementRelationship::Separable
}

/// StructField pairs a field name with a field type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    /// Name is the field name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Type is the field type.
    #[serde(default, rename = "type")]
    pub field_type: TypeRef,
}

/// List represents a type which contains zero or more elements, all of the
/// same subtype.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct List {
    /// ElementType is the type of the list's elements.
    #[serde(default, rename = "elementType")]
    pub element_type: TypeRef,

    /// ElementRelationship states the relationship between the list's elements.
    #[serde(default, rename = "elementRelationship")]
    pub element_relationship: ElementRelationship,

    /// Keys lists the fields of the element's map type which identify an
    /// element of an associative list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl Schema {
    /// Creates a schema with the given type definitions.
    pub fn with_types(types: Vec<TypeDef>) -> Self {
        Schema {
            types,
            type_map: OnceCell::new(),
            resolved_types: Mutex::new(HashMap::new()),
        }
    }

    /// FindNamedType returns the referenced TypeDef, if it exists.
    pub fn find_named_type(&self, name: &str) -> Option<&TypeDef> {
        let map = self.type_map.get_or_init(|| {
            self.types
                .iter()
                .map(|t| (t.name.clone(), t.clone()))
                .collect()
        });
        map.get(name)
    }

    fn resolve_no_overrides(&self, tr: &TypeRef) -> Option<Atom> {
        if let Some(ref named) = tr.named_type {
            self.find_named_type(named).map(|t| t.atom.clone())
        } else {
            Some((*tr.inlined).clone())
        }
    }

    /// Resolve returns the atom referenced, whether it is inline or named.
    /// Returns None if the type can't be resolved.
    pub fn resolve(&self, tr: &TypeRef) -> Option<Atom> {
        let Some(element_relationship) = tr.element_relationship else {
            return self.resolve_no_overrides(tr);
        };

        let key = TypeRefKey::from(tr);
        {
            let cache = self
                .resolved_types
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(atom) = cache.get(&key) {
                return Some(atom.clone());
            }
        }

        let result = self.resolve_no_overrides(tr)?;
        let result = match (result.map, result.list) {
            (Some(mut map), _) => {
                map.element_relationship = element_relationship;
                Atom {
                    map: Some(map),
                    ..Default::default()
                }
            }
            (_, Some(mut list)) => {
                list.element_relationship = element_relationship;
                Atom {
                    list: Some(list),
                    ..Default::default()
                }
            }
            _ => return None,
        };

        self.resolved_types
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, result.clone());

        Some(result)
    }
}

impl Map {
    /// Creates a new Map with the given fields.
    pub fn with_fields(fields: Vec<StructField>) -> Self {
        Map {
            fields,
            ..Default::default()
        }
    }

    /// FindField returns the referenced StructField, if it exists.
    pub fn find_field(&self, name: &str) -> Option<&StructField> {
        let map = self.field_map.get_or_init(|| {
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.clone()))
                .collect()
        });
        map.get(name)
    }

    /// Returns the type of the named field, falling back to the element type
    /// for keys that are not declared struct fields.
    pub fn field_type(&self, name: &str) -> &TypeRef {
        match self.find_field(name) {
            Some(field) => &field.field_type,
            None => &self.element_type,
        }
    }
}
