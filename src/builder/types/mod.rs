//! Builder type model.
//!
//! `TypeRef` designates the type of a field: a primitive, a reference to a
//! named type by name, or an inline array, map, or union of those. Named types
//! (records, enums, fixed) live in the [`SchemaCache`] and are only ever
//! referenced by name, so forward references and self references are legal
//! until serialization time.

mod enum_type;
mod fixed;
mod record;

pub use enum_type::EnumType;
pub use fixed::FixedType;
pub use record::{RecordKind, RecordType};

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::builder::cache::{CachedType, SchemaCache};
use crate::builder::reference_state::ReferenceState;
use crate::error::BuilderError;

/// Avro primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl PrimitiveType {
    /// Look up a primitive by its schema name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(PrimitiveType::Null),
            "boolean" => Some(PrimitiveType::Boolean),
            "int" => Some(PrimitiveType::Int),
            "long" => Some(PrimitiveType::Long),
            "float" => Some(PrimitiveType::Float),
            "double" => Some(PrimitiveType::Double),
            "bytes" => Some(PrimitiveType::Bytes),
            "string" => Some(PrimitiveType::String),
            _ => None,
        }
    }

    /// The schema name of the primitive.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Null => "null",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Bytes => "bytes",
            PrimitiveType::String => "string",
        }
    }
}

/// The type designator of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// A bare primitive.
    Primitive(PrimitiveType),
    /// A primitive with attributes such as `logicalType`, `precision`, `scale`.
    Annotated {
        primitive: PrimitiveType,
        attributes: IndexMap<String, Value>,
    },
    /// A named type or type macro, resolved through the cache at serialization.
    Named(String),
    /// Array of items.
    Array(Box<TypeRef>),
    /// Map with string keys.
    Map(Box<TypeRef>),
    /// Union of branches.
    Union(Vec<TypeRef>),
}

impl TypeRef {
    pub fn array(items: impl Into<TypeRef>) -> Self {
        TypeRef::Array(Box::new(items.into()))
    }

    pub fn map(values: impl Into<TypeRef>) -> Self {
        TypeRef::Map(Box::new(values.into()))
    }

    pub fn union<I, T>(branches: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeRef>,
    {
        TypeRef::Union(branches.into_iter().map(Into::into).collect())
    }

    /// A primitive annotated with a logical type.
    pub fn logical(primitive: PrimitiveType, logical_type: impl Into<String>) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert("logicalType".to_string(), json!(logical_type.into()));
        TypeRef::Annotated {
            primitive,
            attributes,
        }
    }

    /// A `bytes` decimal with the given precision and scale.
    pub fn decimal(precision: u32, scale: u32) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert("logicalType".to_string(), json!("decimal"));
        attributes.insert("precision".to_string(), json!(precision));
        attributes.insert("scale".to_string(), json!(scale));
        TypeRef::Annotated {
            primitive: PrimitiveType::Bytes,
            attributes,
        }
    }

    /// Serialize the type, resolving names relative to `namespace`.
    pub fn to_document(
        &self,
        namespace: Option<&str>,
        cache: &mut SchemaCache,
        state: &mut ReferenceState,
    ) -> Result<Value, BuilderError> {
        match self {
            TypeRef::Primitive(primitive) => Ok(json!(primitive.as_str())),
            TypeRef::Annotated {
                primitive,
                attributes,
            } => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!(primitive.as_str()));
                for (key, value) in attributes {
                    obj.insert(key.clone(), value.clone());
                }
                Ok(Value::Object(obj))
            }
            TypeRef::Named(name) => match cache.resolve(name, namespace)? {
                CachedType::Named(named) => named.to_document(cache, state),
                CachedType::Macro {
                    namespace: macro_namespace,
                    type_ref,
                    ..
                } => type_ref.to_document(macro_namespace.as_deref(), cache, state),
            },
            TypeRef::Array(items) => Ok(json!({
                "type": "array",
                "items": items.to_document(namespace, cache, state)?,
            })),
            TypeRef::Map(values) => Ok(json!({
                "type": "map",
                "values": values.to_document(namespace, cache, state)?,
            })),
            TypeRef::Union(branches) => branches
                .iter()
                .map(|branch| branch.to_document(namespace, cache, state))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }
}

impl From<PrimitiveType> for TypeRef {
    fn from(primitive: PrimitiveType) -> Self {
        TypeRef::Primitive(primitive)
    }
}

/// Primitive names become primitives; anything else is a named reference.
impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        match PrimitiveType::from_name(name) {
            Some(primitive) => TypeRef::Primitive(primitive),
            None => TypeRef::Named(name.to_string()),
        }
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::from(name.as_str())
    }
}

/// A type with a qualified identity.
#[derive(Debug, Clone, PartialEq)]
pub enum NamedType {
    Record(RecordType),
    Enum(EnumType),
    Fixed(FixedType),
}

impl NamedType {
    pub fn name(&self) -> &str {
        match self {
            NamedType::Record(r) => r.name(),
            NamedType::Enum(e) => e.name(),
            NamedType::Fixed(f) => f.name(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            NamedType::Record(r) => r.namespace(),
            NamedType::Enum(e) => e.namespace(),
            NamedType::Fixed(f) => f.namespace(),
        }
    }

    /// The identity key used by the cache and the reference state.
    pub fn fullname(&self) -> &str {
        match self {
            NamedType::Record(r) => r.fullname(),
            NamedType::Enum(e) => e.fullname(),
            NamedType::Fixed(f) => f.fullname(),
        }
    }

    /// The `type` tag emitted for this type.
    pub fn kind(&self) -> &'static str {
        match self {
            NamedType::Record(r) => r.kind().as_str(),
            NamedType::Enum(_) => "enum",
            NamedType::Fixed(_) => "fixed",
        }
    }

    pub fn as_record(&self) -> Option<&RecordType> {
        match self {
            NamedType::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Emit the full definition the first time this type is seen in `state`,
    /// and the bare fullname afterwards.
    pub fn to_document(
        &self,
        cache: &mut SchemaCache,
        state: &mut ReferenceState,
    ) -> Result<Value, BuilderError> {
        match self {
            NamedType::Record(r) => r.to_document(cache, state),
            NamedType::Enum(e) => Ok(e.to_document(state)),
            NamedType::Fixed(f) => Ok(f.to_document(state)),
        }
    }
}

/// Start a named type document with its `type`, `name`, and `namespace` keys.
///
/// A type in the null namespace written inside a namespaced definition gets
/// `"namespace": ""`, otherwise readers would place it in the enclosing one.
pub(crate) fn named_header(
    kind: &str,
    name: &str,
    namespace: Option<&str>,
    enclosing: Option<&str>,
) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!(kind));
    obj.insert("name".to_string(), json!(name));
    match (namespace, enclosing) {
        (Some(ns), _) => {
            obj.insert("namespace".to_string(), json!(ns));
        }
        (None, Some(_)) => {
            obj.insert("namespace".to_string(), json!(""));
        }
        (None, None) => {}
    }
    obj
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuilderConfig;

    #[test]
    fn test_type_ref_from_str() {
        assert_eq!(TypeRef::from("int"), TypeRef::Primitive(PrimitiveType::Int));
        assert_eq!(TypeRef::from("Person"), TypeRef::Named("Person".to_string()));
        assert_eq!(
            TypeRef::from("com.example.Person"),
            TypeRef::Named("com.example.Person".to_string())
        );
    }

    #[test]
    fn test_composite_documents() {
        let mut cache = SchemaCache::new(BuilderConfig::default());
        let mut state = ReferenceState::new();

        let ty = TypeRef::map(TypeRef::array(TypeRef::union(["null", "long"])));
        let doc = ty.to_document(None, &mut cache, &mut state).unwrap();
        assert_eq!(
            doc,
            json!({"type": "map", "values": {"type": "array", "items": ["null", "long"]}})
        );
    }

    #[test]
    fn test_annotated_documents() {
        let mut cache = SchemaCache::new(BuilderConfig::default());
        let mut state = ReferenceState::new();

        let ts = TypeRef::logical(PrimitiveType::Long, "timestamp-millis");
        assert_eq!(
            ts.to_document(None, &mut cache, &mut state).unwrap(),
            json!({"type": "long", "logicalType": "timestamp-millis"})
        );

        let dec = TypeRef::decimal(10, 2);
        assert_eq!(
            dec.to_document(None, &mut cache, &mut state).unwrap(),
            json!({"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2})
        );
    }

    #[test]
    fn test_unresolved_named_reference() {
        let mut cache = SchemaCache::new(BuilderConfig::default());
        let mut state = ReferenceState::new();

        let err = TypeRef::from("Missing")
            .to_document(Some("ns"), &mut cache, &mut state)
            .unwrap_err();
        assert!(matches!(err, BuilderError::UnresolvedType { .. }));
    }
}
