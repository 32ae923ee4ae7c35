//! One-shot build functions.
//!
//! Each call owns a fresh [`SchemaBuilder`], so its registry and reference
//! state are discarded when it returns.

use std::path::Path;

use serde_json::Value;

use crate::builder::Dsl;
use crate::config::BuilderConfig;
use crate::error::BuilderError;
use crate::schema::AvroSchema;

use super::builder::SchemaBuilder;

/// Evaluate builder calls and return the root type's document as text.
///
/// # Arguments
/// * `config` - Builder configuration (load paths, allowed attributes, output)
/// * `declare` - Closure driving the [`Dsl`]; the last named type it declares
///   is the root
///
/// # Returns
/// The schema document, or the first error raised while declaring, resolving,
/// or serializing.
///
/// # Example
/// ```
/// use avro_builder::{build, BuilderConfig, DefineTypes, FieldOptions};
///
/// let json = build(BuilderConfig::default(), |dsl| {
///     dsl.record("ns.Person", |r| {
///         r.required("name", "string", FieldOptions::new())?;
///         r.optional("age", "int", FieldOptions::new())
///     })?;
///     Ok(())
/// })
/// .unwrap();
///
/// assert!(json.contains(r#""type":["null","int"]"#));
/// ```
pub fn build<F>(config: BuilderConfig, declare: F) -> Result<String, BuilderError>
where
    F: FnOnce(&mut Dsl<'_>) -> Result<(), BuilderError>,
{
    build_dsl(config, declare)?.to_json()
}

/// Evaluate builder calls and return the root type as a validated schema
/// object.
pub fn build_schema<F>(config: BuilderConfig, declare: F) -> Result<AvroSchema, BuilderError>
where
    F: FnOnce(&mut Dsl<'_>) -> Result<(), BuilderError>,
{
    build_dsl(config, declare)?.to_schema()
}

/// Evaluate builder calls and return the populated builder, for serializing
/// types other than the root or sharing a pass between several of them.
pub fn build_dsl<F>(config: BuilderConfig, declare: F) -> Result<SchemaBuilder, BuilderError>
where
    F: FnOnce(&mut Dsl<'_>) -> Result<(), BuilderError>,
{
    let mut builder = SchemaBuilder::new(config);
    builder.define(declare)?;
    Ok(builder)
}

/// Build from declaration text in the JSON declaration format.
pub fn build_str(config: BuilderConfig, text: &str) -> Result<String, BuilderError> {
    let mut builder = SchemaBuilder::new(config);
    builder.define_str(text)?;
    builder.to_json()
}

/// Build from a declaration file.
pub fn build_file(config: BuilderConfig, path: impl AsRef<Path>) -> Result<String, BuilderError> {
    let mut builder = SchemaBuilder::new(config);
    builder.define_file(path)?;
    builder.to_json()
}

/// Build from declaration text and return the document value.
pub fn build_value(config: BuilderConfig, text: &str) -> Result<Value, BuilderError> {
    let mut builder = SchemaBuilder::new(config);
    builder.define_str(text)?;
    builder.to_json_value()
}
