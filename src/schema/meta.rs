//! Field-merge metadata for one kind of object.

use super::elements::{ElementRelationship, Map, Schema, TypeRef};
use crate::value::Value;
#[cfg(test)]
use once_cell::sync::Lazy;

/// PatchMeta pairs a schema with the root type of an object kind.
///
/// It answers, for every node of a document, whether the node merges key by
/// key, element-wise by a list key, as a set, or is replaced wholesale.
#[derive(Debug, Clone)]
pub struct PatchMeta {
    schema: Schema,
    root: TypeRef,
}

/// The merge behavior of one document node.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Map merged key by key.
    Struct(Map),
    /// List merged element-wise, elements identified by `keys`.
    KeyedList { keys: Vec<String>, element: TypeRef },
    /// List of scalars merged by value.
    SetList,
    /// Replaced wholesale.
    Atomic,
}

impl PatchMeta {
    /// Creates metadata rooted at `root` within `schema`.
    pub fn new(schema: Schema, root: TypeRef) -> Self {
        PatchMeta { schema, root }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn root(&self) -> &TypeRef {
        &self.root
    }

    /// Returns true if the root type exists in the schema.
    pub fn is_resolvable(&self) -> bool {
        self.schema.resolve(&self.root).is_some()
    }

    /// Classifies the node of type `tr` whose value looks like `sample`.
    ///
    /// Types that cannot be resolved, or whose declared kind doesn't match the
    /// sample, are atomic.
    pub fn shape(&self, tr: &TypeRef, sample: &Value) -> Shape {
        let Some(atom) = self.schema.resolve(tr) else {
            return Shape::Atomic;
        };

        match sample {
            Value::Map(_) => match atom.map {
                Some(map) if map.element_relationship != ElementRelationship::Atomic => {
                    Shape::Struct(map)
                }
                _ => Shape::Atomic,
            },
            Value::List(_) => match atom.list {
                Some(list) if list.element_relationship == ElementRelationship::Associative => {
                    if list.keys.is_empty() {
                        Shape::SetList
                    } else {
                        Shape::KeyedList {
                            keys: list.keys,
                            element: list.element_type,
                        }
                    }
                }
                _ => Shape::Atomic,
            },
            _ => Shape::Atomic,
        }
    }
}

#[cfg(test)]
impl PatchMeta {
    /// Metadata that merges every map key by key and treats every list as
    /// atomic, i.e. the behavior of a plain merge patch.
    pub(crate) fn deduced() -> Self {
        PatchMeta::new(DEDUCED_SCHEMA.clone(), TypeRef::named("__untyped_deduced_"))
    }
}

#[cfg(test)]
static DEDUCED_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    serde_yaml::from_str(DEDUCED_SCHEMA_YAML).expect("deduced schema is a valid constant")
});

#[cfg(test)]
const DEDUCED_SCHEMA_YAML: &str = r#"types:
- name: __untyped_atomic_
  scalar: untyped
  list:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
  map:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
- name: __untyped_deduced_
  scalar: untyped
  list:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
  map:
    elementType:
      namedType: __untyped_deduced_
    elementRelationship: separable
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Parser;
    use crate::value::from_json;

    const POD_SCHEMA: &str = r#"types:
- name: pod
  map:
    fields:
    - name: containers
      type:
        list:
          elementType:
            namedType: container
          elementRelationship: associative
          keys: [name]
    - name: finalizers
      type:
        list:
          elementType:
            scalar: string
          elementRelationship: associative
    - name: args
      type:
        list:
          elementType:
            scalar: string
          elementRelationship: atomic
- name: container
  map:
    fields:
    - name: name
      type:
        scalar: string
"#;

    #[test]
    fn test_shapes() {
        let meta = Parser::new(POD_SCHEMA).unwrap().patch_meta("pod");
        let pod = meta.shape(meta.root(), &from_json("{}").unwrap());
        let Shape::Struct(map) = pod else {
            panic!("expected struct, got {:?}", pod);
        };

        let list = from_json("[]").unwrap();
        assert_eq!(
            meta.shape(map.field_type("containers"), &list),
            Shape::KeyedList {
                keys: vec!["name".to_string()],
                element: TypeRef::named("container"),
            }
        );
        assert_eq!(meta.shape(map.field_type("finalizers"), &list), Shape::SetList);
        assert_eq!(meta.shape(map.field_type("args"), &list), Shape::Atomic);
        // Undeclared field without an element type.
        assert_eq!(meta.shape(map.field_type("unknown"), &list), Shape::Atomic);
        // Declared list, but the value is a map.
        assert_eq!(
            meta.shape(map.field_type("containers"), &from_json("{}").unwrap()),
            Shape::Atomic
        );
    }

    #[test]
    fn test_deduced_meta() {
        let meta = PatchMeta::deduced();
        assert!(meta.is_resolvable());
        assert!(matches!(
            meta.shape(meta.root(), &from_json("{}").unwrap()),
            Shape::Struct(_)
        ));
        assert_eq!(
            meta.shape(meta.root(), &from_json("[1]").unwrap()),
            Shape::Atomic
        );
    }

    #[test]
    fn test_unresolvable_root() {
        let meta = Parser::new(POD_SCHEMA).unwrap().patch_meta("deployment");
        assert!(!meta.is_resolvable());
    }
}
