//! Named type registry and reference-resolving serializer.
//!
//! Types are declared through [`Dsl`] and [`RecordBuilder`], registered in a
//! per-build [`SchemaCache`], and serialized with a fresh [`ReferenceState`] so
//! that every named type is defined exactly once and referenced by fullname
//! everywhere else.

mod cache;
mod dsl;
mod field;
mod loader;
mod metadata;
pub mod name;
mod reference_state;
mod types;

pub use cache::{CachedType, SchemaCache};
pub use dsl::{anonymous_name, DefineTypes, Dsl, RecordBuilder};
pub use field::{Field, FieldOptions, FieldOrder};
pub use loader::{Declaration, DeclarationLibrary, DefinitionLoader, FileSystemLoader};
pub use metadata::{HasMetadata, Metadata, RESERVED_ATTRIBUTES};
pub use reference_state::ReferenceState;
pub use types::{
    EnumType, FixedType, NamedType, PrimitiveType, RecordKind, RecordType, TypeRef,
};
