//! Record fields.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::builder::cache::SchemaCache;
use crate::builder::metadata::{check_attribute, HasMetadata, Metadata};
use crate::builder::name;
use crate::builder::reference_state::ReferenceState;
use crate::builder::types::TypeRef;
use crate::config::BuilderConfig;
use crate::error::BuilderError;

/// Field ordering hint for record comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrder {
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOrder::Ascending => "ascending",
            FieldOrder::Descending => "descending",
            FieldOrder::Ignore => "ignore",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ascending" => Some(FieldOrder::Ascending),
            "descending" => Some(FieldOrder::Descending),
            "ignore" => Some(FieldOrder::Ignore),
            _ => None,
        }
    }
}

/// Options accepted by `required` and `optional`.
///
/// # Example
/// ```
/// use avro_builder::FieldOptions;
/// use serde_json::json;
///
/// let options = FieldOptions::new()
///     .with_doc("Age in years")
///     .with_default(json!(0));
/// assert_eq!(options.default, Some(json!(0)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOptions {
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub default: Option<Value>,
    pub order: Option<FieldOrder>,
    /// Namespace used to resolve named type references instead of the record's.
    pub namespace: Option<String>,
    /// Extra attributes, checked against the configured allow-list.
    pub attributes: IndexMap<String, Value>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_order(mut self, order: FieldOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// A named, typed slot in a record.
///
/// The field's type is serialized lazily, so it may name a type that is
/// declared later. Cloning a field yields a fully independent copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    type_ref: TypeRef,
    type_namespace: Option<String>,
    optional: bool,
    default: Option<Value>,
    order: Option<FieldOrder>,
    metadata: Metadata,
}

impl Field {
    /// A required field with no metadata.
    pub fn new(name: impl Into<String>, type_ref: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            type_ref: type_ref.into(),
            type_namespace: None,
            optional: false,
            default: None,
            order: None,
            metadata: Metadata::default(),
        }
    }

    /// Build a field from options, resolving named types against
    /// `ambient_namespace` unless the options override it.
    pub fn from_options(
        name: &str,
        type_ref: TypeRef,
        optional: bool,
        ambient_namespace: Option<&str>,
        options: FieldOptions,
        config: &BuilderConfig,
    ) -> Result<Self, BuilderError> {
        name::validate_name(name, "Field", config.strict_names)?;

        let mut attributes = IndexMap::new();
        for (key, value) in options.attributes {
            if check_attribute(config, &key)? {
                attributes.insert(key, value);
            }
        }

        Ok(Self {
            name: name.to_string(),
            type_ref,
            type_namespace: options
                .namespace
                .or_else(|| ambient_namespace.map(String::from)),
            optional,
            default: options.default,
            order: options.order,
            metadata: Metadata {
                doc: options.doc,
                aliases: options.aliases,
                logical_type: None,
                attributes,
            },
        })
    }

    /// Builder-style: mark the field optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Builder-style: resolve named types relative to `namespace`.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.type_namespace = Some(namespace.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn set_type(&mut self, type_ref: impl Into<TypeRef>) {
        self.type_ref = type_ref.into();
    }

    pub fn type_namespace(&self) -> Option<&str> {
        self.type_namespace.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.optional = optional;
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn set_default(&mut self, default: Option<Value>) {
        self.default = default;
    }

    pub fn order(&self) -> Option<FieldOrder> {
        self.order
    }

    pub fn set_order(&mut self, order: Option<FieldOrder>) {
        self.order = order;
    }

    pub fn to_document(
        &self,
        cache: &mut SchemaCache,
        state: &mut ReferenceState,
    ) -> Result<Value, BuilderError> {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(&self.name));

        let mut ty = self
            .type_ref
            .to_document(self.type_namespace(), cache, state)?;
        if self.optional {
            ty = nullable(ty, self.default.as_ref());
        }
        obj.insert("type".to_string(), ty);

        match (&self.default, self.optional) {
            (Some(default), _) => {
                obj.insert("default".to_string(), default.clone());
            }
            (None, true) => {
                obj.insert("default".to_string(), Value::Null);
            }
            (None, false) => {}
        }

        if let Some(order) = self.order {
            obj.insert("order".to_string(), json!(order.as_str()));
        }

        self.metadata.write_to(&mut obj);
        Ok(Value::Object(obj))
    }
}

impl HasMetadata for Field {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Union `ty` with null.
///
/// An existing union absorbs null instead of nesting. Null comes first unless a
/// non-null default is given, which must match the first branch.
fn nullable(ty: Value, default: Option<&Value>) -> Value {
    let null = json!("null");
    let mut branches = match ty {
        Value::Array(branches) => branches,
        other => vec![other],
    };
    branches.retain(|branch| branch != &null);

    if default.is_some_and(|d| !d.is_null()) {
        branches.push(null);
    } else {
        branches.insert(0, null);
    }
    Value::Array(branches)
}
