use indexmap::IndexMap;
use serde_json::Value;

use super::named_header;
use crate::builder::cache::SchemaCache;
use crate::builder::field::Field;
use crate::builder::metadata::{HasMetadata, Metadata};
use crate::builder::name;
use crate::builder::reference_state::ReferenceState;
use crate::error::BuilderError;

/// Whether a record is emitted as `record` or `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordKind {
    #[default]
    Record,
    Error,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Record => "record",
            RecordKind::Error => "error",
        }
    }
}

/// A record type with an ordered set of fields keyed by field name.
///
/// Adding a field whose name already exists replaces the existing field in
/// its original position; new names are appended.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    kind: RecordKind,
    name: String,
    namespace: Option<String>,
    fullname: String,
    is_abstract: bool,
    metadata: Metadata,
    fields: IndexMap<String, Field>,
}

impl RecordType {
    /// Create a record. A qualified `name` overrides `namespace`.
    pub fn new(name: &str, namespace: Option<&str>) -> Result<Self, BuilderError> {
        Self::with_kind(RecordKind::Record, name, namespace)
    }

    /// Create an error type.
    pub fn new_error(name: &str, namespace: Option<&str>) -> Result<Self, BuilderError> {
        Self::with_kind(RecordKind::Error, name, namespace)
    }

    pub fn with_kind(
        kind: RecordKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Self, BuilderError> {
        let (name, namespace) = name::split(name, namespace);
        name::validate_name(&name, "Record", false)?;
        let fullname = name::qualify(&name, namespace.as_deref());
        Ok(Self {
            kind,
            name,
            namespace,
            fullname,
            is_abstract: false,
            metadata: Metadata::default(),
            fields: IndexMap::new(),
        })
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    /// Abstract records are meant to be extended, not stored as schemas.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn set_abstract(&mut self, is_abstract: bool) {
        self.is_abstract = is_abstract;
    }

    /// Fields in serialization order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Add a field, returning the field it replaced, if any.
    pub fn add_field(&mut self, field: Field) -> Option<Field> {
        self.fields.insert(field.name().to_string(), field)
    }

    /// Independent copies of every field, for `extends`.
    pub fn duplicated_fields(&self) -> Vec<Field> {
        self.fields.values().cloned().collect()
    }

    /// Merge fields with the same replacement rule as [`RecordType::add_field`].
    pub fn merge_fields(&mut self, fields: impl IntoIterator<Item = Field>) {
        for field in fields {
            self.add_field(field);
        }
    }

    /// Serialize as a definition, or as a bare fullname if already emitted.
    ///
    /// The fullname is marked before the fields are visited, so a record that
    /// reaches itself through its fields emits a name reference at that point.
    pub fn to_document(
        &self,
        cache: &mut SchemaCache,
        state: &mut ReferenceState,
    ) -> Result<Value, BuilderError> {
        state.definition_or_reference(&self.fullname, |state| {
            let mut obj = named_header(
                self.kind.as_str(),
                &self.name,
                self.namespace(),
                state.enclosing_namespace(),
            );
            let fields = state.within_namespace(self.namespace(), |state| {
                self.fields
                    .values()
                    .map(|field| field.to_document(cache, state))
                    .collect::<Result<Vec<_>, _>>()
            })?;
            obj.insert("fields".to_string(), Value::Array(fields));
            self.metadata.write_to(&mut obj);
            Ok(Value::Object(obj))
        })
    }
}

impl HasMetadata for RecordType {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
