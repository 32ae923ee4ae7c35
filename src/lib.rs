//! Avro schema builder
//!
//! This library builds Avro schema documents from declarative record
//! definitions. Named types (records, enums, fixed) live in a per-build
//! registry, reference each other by fullname, can copy fields from one
//! another with `extends`, and are serialized so that each named type is
//! defined exactly once per document and referenced by fullname everywhere
//! else.

pub mod api;
pub mod builder;
pub mod config;
pub mod declaration;
pub mod error;
pub mod schema;
pub mod store;

// Re-export main types
pub use api::{build, build_dsl, build_file, build_schema, build_str, build_value, SchemaBuilder};
pub use builder::{
    CachedType, Declaration, DeclarationLibrary, DefineTypes, DefinitionLoader, Dsl, EnumType,
    Field, FieldOptions, FieldOrder, FileSystemLoader, FixedType, HasMetadata, Metadata,
    NamedType, PrimitiveType, RecordBuilder, RecordKind, RecordType, ReferenceState, SchemaCache,
    TypeRef,
};
pub use config::{AttributePolicy, BuilderConfig};
pub use error::{BuilderError, SchemaError};
pub use schema::{
    parse_schema, AvroSchema, EnumSchema, FieldSchema, FixedSchema, LogicalType, LogicalTypeName,
    RecordSchema, SchemaParser,
};
pub use store::SchemaStore;
