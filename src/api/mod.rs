//! Public build API.
//!
//! # Module Structure
//! - `builder`: `SchemaBuilder`, which owns one build's registry and root
//! - `build`: one-shot functions over a fresh builder

mod build;
mod builder;

pub use build::{build, build_dsl, build_file, build_schema, build_str, build_value};
pub use builder::SchemaBuilder;
