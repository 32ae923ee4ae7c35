//! Metadata shared by fields and named types.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::config::{AttributePolicy, BuilderConfig};
use crate::error::BuilderError;

/// Keys that have a fixed meaning in a schema document and can never be
/// supplied as extra attributes.
pub const RESERVED_ATTRIBUTES: &[&str] = &[
    "type",
    "name",
    "namespace",
    "fields",
    "symbols",
    "size",
    "items",
    "values",
    "default",
    "doc",
    "aliases",
    "order",
    "logicalType",
];

/// Documentation, aliases, logical type, and allow-listed extra attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub logical_type: Option<String>,
    /// Extra attributes in declaration order.
    pub attributes: IndexMap<String, Value>,
}

impl Metadata {
    /// Append the present metadata keys to a document; absent values are omitted.
    pub(crate) fn write_to(&self, obj: &mut Map<String, Value>) {
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }
        if let Some(logical_type) = &self.logical_type {
            obj.insert("logicalType".to_string(), json!(logical_type));
        }
        for (key, value) in &self.attributes {
            if !value.is_null() {
                obj.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Capability of carrying [`Metadata`].
pub trait HasMetadata {
    fn metadata(&self) -> &Metadata;

    fn metadata_mut(&mut self) -> &mut Metadata;

    fn doc(&self) -> Option<&str> {
        self.metadata().doc.as_deref()
    }

    fn set_doc(&mut self, doc: impl Into<String>) {
        self.metadata_mut().doc = Some(doc.into());
    }

    fn aliases(&self) -> &[String] {
        &self.metadata().aliases
    }

    fn set_aliases<I, S>(&mut self, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata_mut().aliases = aliases.into_iter().map(Into::into).collect();
    }

    fn logical_type(&self) -> Option<&str> {
        self.metadata().logical_type.as_deref()
    }

    fn set_logical_type(&mut self, logical_type: impl Into<String>) {
        self.metadata_mut().logical_type = Some(logical_type.into());
    }

    fn attribute(&self, key: &str) -> Option<&Value> {
        self.metadata().attributes.get(key)
    }

    /// Set an extra attribute, subject to the configured allow-list.
    fn set_attribute(
        &mut self,
        config: &BuilderConfig,
        key: &str,
        value: Value,
    ) -> Result<(), BuilderError> {
        if check_attribute(config, key)? {
            self.metadata_mut()
                .attributes
                .insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// Decide whether an extra attribute is kept (`true`) or dropped (`false`).
pub(crate) fn check_attribute(config: &BuilderConfig, key: &str) -> Result<bool, BuilderError> {
    if RESERVED_ATTRIBUTES.contains(&key) {
        return Err(BuilderError::InvalidDefinition(format!(
            "'{}' is reserved and cannot be set as an extra attribute",
            key
        )));
    }
    if config.allows_attribute(key) {
        return Ok(true);
    }
    match config.unknown_attributes {
        AttributePolicy::Reject => Err(BuilderError::InvalidDefinition(format!(
            "Attribute '{}' is not an allowed metadata attribute",
            key
        ))),
        AttributePolicy::Ignore => {
            warn!(attribute = key, "ignoring metadata attribute that is not allowed");
            Ok(false)
        }
    }
}
