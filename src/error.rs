//! Error types for schema building

use thiserror::Error;

/// Errors that can occur while parsing or validating a schema object
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Invalid schema format
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Unsupported schema type
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    /// Schema parsing error
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Errors that can occur while declaring, resolving, or serializing types
#[derive(Debug, Error)]
pub enum BuilderError {
    /// A referenced type could not be found in the cache or through the loader
    #[error("Unresolved type: {}", display_name(.name, .namespace.as_deref()))]
    UnresolvedType {
        name: String,
        namespace: Option<String>,
    },

    /// A type or field definition violates a structural rule
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    /// A named type was defined twice
    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    /// A declaration could not be evaluated
    #[error("Evaluation error in {origin}: {message}")]
    Evaluation { origin: String, message: String },

    /// The generated document is not a valid schema
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuilderError {
    pub(crate) fn unresolved(name: &str, namespace: Option<&str>) -> Self {
        BuilderError::UnresolvedType {
            name: name.to_string(),
            namespace: namespace.map(String::from),
        }
    }

    pub(crate) fn evaluation(origin: impl Into<String>, message: impl Into<String>) -> Self {
        BuilderError::Evaluation {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

fn display_name(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !name.contains('.') => format!("'{}' (namespace '{}')", name, ns),
        _ => format!("'{}'", name),
    }
}
