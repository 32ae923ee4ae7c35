use serde_json::{json, Value};

use super::named_header;
use crate::builder::metadata::{HasMetadata, Metadata};
use crate::builder::name;
use crate::builder::reference_state::ReferenceState;
use crate::error::BuilderError;

/// A fixed-size byte type.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedType {
    name: String,
    namespace: Option<String>,
    fullname: String,
    size: usize,
    precision: Option<u32>,
    scale: Option<u32>,
    metadata: Metadata,
}

impl FixedType {
    /// Create a fixed type; `size` must be positive.
    pub fn new(name: &str, namespace: Option<&str>, size: usize) -> Result<Self, BuilderError> {
        let (name, namespace) = name::split(name, namespace);
        name::validate_name(&name, "Fixed", false)?;
        if size == 0 {
            return Err(BuilderError::InvalidDefinition(format!(
                "Fixed '{}' must have a positive size",
                name
            )));
        }

        let fullname = name::qualify(&name, namespace.as_deref());
        Ok(Self {
            name,
            namespace,
            fullname,
            size,
            precision: None,
            scale: None,
            metadata: Metadata::default(),
        })
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

    pub fn size(&self) -> usize {
        self.size
    }

    /// Mark the fixed as a `decimal` logical type.
    pub fn set_decimal(&mut self, precision: u32, scale: u32) {
        self.set_logical_type("decimal");
        self.precision = Some(precision);
        self.scale = Some(scale);
    }

    pub fn to_document(&self, state: &mut ReferenceState) -> Value {
        state.reference_or_define(&self.fullname, |state| {
            let mut obj = named_header(
                "fixed",
                &self.name,
                self.namespace(),
                state.enclosing_namespace(),
            );
            obj.insert("size".to_string(), json!(self.size));
            self.metadata.write_to(&mut obj);
            if let Some(precision) = self.precision {
                obj.insert("precision".to_string(), json!(precision));
            }
            if let Some(scale) = self.scale {
                obj.insert("scale".to_string(), json!(scale));
            }
            Value::Object(obj)
        })
    }
}

impl HasMetadata for FixedType {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
