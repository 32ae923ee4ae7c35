//! Avro schema objects.
//!
//! The structured form of a built document: primitives, complex and named
//! types, and logical types, plus the parser that validates a document while
//! producing them.

mod parser;
mod types;

pub use parser::{parse_schema, SchemaParser};
pub use types::*;
