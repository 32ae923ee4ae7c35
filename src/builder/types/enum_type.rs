use std::collections::HashSet;

use serde_json::{json, Value};

use super::named_header;
use crate::builder::metadata::{HasMetadata, Metadata};
use crate::builder::name;
use crate::builder::reference_state::ReferenceState;
use crate::error::BuilderError;

/// An enum type with an ordered, unique, non-empty list of symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    name: String,
    namespace: Option<String>,
    fullname: String,
    symbols: Vec<String>,
    default: Option<String>,
    metadata: Metadata,
}

impl EnumType {
    pub fn new<I, S>(name: &str, namespace: Option<&str>, symbols: I) -> Result<Self, BuilderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (name, namespace) = name::split(name, namespace);
        name::validate_name(&name, "Enum", false)?;

        let symbols: Vec<String> = symbols.into_iter().map(Into::into).collect();
        if symbols.is_empty() {
            return Err(BuilderError::InvalidDefinition(format!(
                "Enum '{}' must have at least one symbol",
                name
            )));
        }
        let mut seen = HashSet::new();
        for symbol in &symbols {
            name::validate_name(symbol, "Enum symbol", false)?;
            if !seen.insert(symbol.as_str()) {
                return Err(BuilderError::InvalidDefinition(format!(
                    "Enum '{}' has duplicate symbol '{}'",
                    name, symbol
                )));
            }
        }

        let fullname = name::qualify(&name, namespace.as_deref());
        Ok(Self {
            name,
            namespace,
            fullname,
            symbols,
            default: None,
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

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn default_symbol(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Set the default symbol; it must be one of the symbols.
    pub fn set_default(&mut self, symbol: impl Into<String>) -> Result<(), BuilderError> {
        let symbol = symbol.into();
        if !self.symbols.contains(&symbol) {
            return Err(BuilderError::InvalidDefinition(format!(
                "Default '{}' is not a symbol of enum '{}'",
                symbol, self.name
            )));
        }
        self.default = Some(symbol);
        Ok(())
    }

    pub fn to_document(&self, state: &mut ReferenceState) -> Value {
        state.reference_or_define(&self.fullname, |state| {
            let mut obj = named_header(
                "enum",
                &self.name,
                self.namespace(),
                state.enclosing_namespace(),
            );
            obj.insert("symbols".to_string(), json!(&self.symbols));
            if let Some(default) = &self.default {
                obj.insert("default".to_string(), json!(default));
            }
            self.metadata.write_to(&mut obj);
            Value::Object(obj)
        })
    }
}

impl HasMetadata for EnumType {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
