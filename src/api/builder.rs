//! `SchemaBuilder`: one build's registry plus its root type.
//!
//! A builder owns the [`SchemaCache`] for a single build. Declarations are
//! evaluated against it in order, and the last named type declared becomes
//! the root that [`SchemaBuilder::to_json`] serializes. Every serialization
//! starts from a fresh [`ReferenceState`], so nothing emitted by one build
//! leaks into the next.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::builder::{
    Declaration, DefinitionLoader, Dsl, NamedType, ReferenceState, SchemaCache,
};
use crate::config::BuilderConfig;
use crate::error::BuilderError;
use crate::schema::{AvroSchema, SchemaParser};

/// Builds schema documents from declarations.
#[derive(Debug)]
pub struct SchemaBuilder {
    cache: SchemaCache,
    root: Option<String>,
}

impl SchemaBuilder {
    /// Create a builder. Missing definitions are looked up under the config's
    /// load paths, if any.
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            cache: SchemaCache::new(config),
            root: None,
        }
    }

    /// Create a builder that resolves missing definitions through `loader`.
    pub fn with_loader(config: BuilderConfig, loader: impl DefinitionLoader + 'static) -> Self {
        Self {
            cache: SchemaCache::with_loader(config, loader),
            root: None,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        self.cache.config()
    }

    /// Evaluate builder calls in a fresh top-level scope.
    ///
    /// # Arguments
    /// * `declare` - Closure driving the [`Dsl`]
    ///
    /// # Returns
    /// The fullname of the last top-level named type declared, which also
    /// becomes the root. If `declare` fails, every type it registered is
    /// removed from the cache again.
    ///
    /// # Example
    /// ```
    /// use avro_builder::{BuilderConfig, DefineTypes, FieldOptions, SchemaBuilder};
    ///
    /// let mut builder = SchemaBuilder::new(BuilderConfig::default());
    /// builder
    ///     .define(|dsl| {
    ///         dsl.namespace("com.example")?;
    ///         dsl.record("Person", |r| {
    ///             r.required("name", "string", FieldOptions::new())?;
    ///             r.optional("age", "int", FieldOptions::new())
    ///         })?;
    ///         Ok(())
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(builder.root(), Some("com.example.Person"));
    /// ```
    pub fn define<F>(&mut self, declare: F) -> Result<Option<String>, BuilderError>
    where
        F: FnOnce(&mut Dsl<'_>) -> Result<(), BuilderError>,
    {
        let mark = self.cache.checkpoint();
        let mut dsl = Dsl::new(&mut self.cache);
        let result = declare(&mut dsl).map(|()| dsl.last_defined().map(String::from));
        self.finish("<closure>", mark, result)
    }

    /// Evaluate a prepared declaration.
    pub fn define_declaration(
        &mut self,
        declaration: Declaration,
    ) -> Result<Option<String>, BuilderError> {
        let origin = declaration.origin().to_string();
        let mark = self.cache.checkpoint();
        let result = declaration.evaluate(&mut self.cache);
        self.finish(&origin, mark, result)
    }

    fn finish(
        &mut self,
        origin: &str,
        mark: usize,
        result: Result<Option<String>, BuilderError>,
    ) -> Result<Option<String>, BuilderError> {
        let last = match result {
            Ok(last) => last,
            Err(err) => {
                self.cache.rollback(mark);
                return Err(err);
            }
        };

        debug!(origin, root = ?last, "evaluated declaration");
        if let Some(fullname) = &last {
            self.root = Some(fullname.clone());
        }
        Ok(last)
    }

    /// Evaluate declaration text in the JSON declaration format.
    pub fn define_str(&mut self, text: &str) -> Result<Option<String>, BuilderError> {
        self.define_declaration(Declaration::from_json_str("<string>", text)?)
    }

    /// Evaluate a declaration file.
    pub fn define_file(&mut self, path: impl AsRef<Path>) -> Result<Option<String>, BuilderError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let text = fs::read_to_string(path)
            .map_err(|e| BuilderError::evaluation(origin.clone(), e.to_string()))?;
        self.define_declaration(Declaration::from_json_str(origin, &text)?)
    }

    /// Fullname of the type `to_json` serializes.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Serialize a different named type as the root.
    pub fn set_root(&mut self, fullname: impl Into<String>) {
        self.root = Some(fullname.into());
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut SchemaCache {
        &mut self.cache
    }

    /// Resolve a named type through the cache, loading it if needed.
    pub fn lookup_named_type(
        &mut self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Rc<NamedType>, BuilderError> {
        self.cache.lookup_named_type(name, namespace)
    }

    /// Serialize a named type in its own pass.
    pub fn serialize(&mut self, name: &str, namespace: Option<&str>) -> Result<Value, BuilderError> {
        self.serialize_with(name, namespace, &mut ReferenceState::new())
    }

    /// Serialize a named type as part of a pass shared with other calls.
    ///
    /// Types already emitted in `state` become bare fullname references.
    pub fn serialize_with(
        &mut self,
        name: &str,
        namespace: Option<&str>,
        state: &mut ReferenceState,
    ) -> Result<Value, BuilderError> {
        let named = self.cache.lookup_named_type(name, namespace)?;
        named.to_document(&mut self.cache, state)
    }

    /// Serialize the root type to a document value.
    pub fn to_json_value(&mut self) -> Result<Value, BuilderError> {
        let root = self.root.clone().ok_or_else(|| {
            BuilderError::evaluation("build", "declaration does not define a named type")
        })?;
        debug!(root = %root, "serializing root type");
        self.serialize(&root, None)
    }

    /// Serialize the root type to text, indented when the config asks for it.
    pub fn to_json(&mut self) -> Result<String, BuilderError> {
        let value = self.to_json_value()?;
        let text = if self.config().pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }

    /// Serialize the root type and parse the document into a schema object.
    pub fn to_schema(&mut self) -> Result<AvroSchema, BuilderError> {
        let value = self.to_json_value()?;
        let mut parser = SchemaParser::new().with_strict(self.config().strict_names);
        Ok(parser.parse(&value)?)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DefineTypes, FieldOptions};
    use serde_json::json;

    #[test]
    fn test_define_sets_root_to_last_type() {
        let mut builder = SchemaBuilder::default();
        let last = builder
            .define(|dsl| {
                dsl.fixed("ns.Id", 16, |_| Ok(()))?;
                dsl.record("ns.Holder", |r| r.required("id", "ns.Id", FieldOptions::new()))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(last.as_deref(), Some("ns.Holder"));
        assert_eq!(builder.root(), Some("ns.Holder"));
    }

    #[test]
    fn test_failed_define_rolls_back() {
        let mut builder = SchemaBuilder::default();
        let result = builder.define(|dsl| {
            dsl.record("ns.Kept", |r| r.required("a", "int", FieldOptions::new()))?;
            Err(BuilderError::InvalidDefinition("stop".to_string()))
        });

        assert!(result.is_err());
        assert!(!builder.cache().contains("ns.Kept"));
        assert_eq!(builder.root(), None);
    }

    #[test]
    fn test_to_json_without_root_fails() {
        let mut builder = SchemaBuilder::default();
        assert!(matches!(
            builder.to_json(),
            Err(BuilderError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_each_serialization_is_a_fresh_pass() {
        let mut builder = SchemaBuilder::default();
        builder
            .define(|dsl| {
                dsl.enumeration("Color", ["RED"], |_| Ok(()))?;
                Ok(())
            })
            .unwrap();

        let expected = json!({"type": "enum", "name": "Color", "symbols": ["RED"]});
        assert_eq!(builder.to_json_value().unwrap(), expected);
        assert_eq!(builder.to_json_value().unwrap(), expected);
    }

    #[test]
    fn test_pretty_output() {
        let mut builder = SchemaBuilder::new(BuilderConfig::new().with_pretty(true));
        builder
            .define(|dsl| {
                dsl.fixed("Hash", 4, |_| Ok(()))?;
                Ok(())
            })
            .unwrap();
        assert!(builder.to_json().unwrap().contains("\n  \"type\": \"fixed\""));
    }
}
