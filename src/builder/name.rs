//! Qualified names.
//!
//! A named type's identity is its fullname: `namespace.name` when a namespace
//! applies, else the bare name. A name that already contains a dot carries its
//! own namespace and ignores the ambient one.

use tracing::warn;

use crate::error::BuilderError;

/// Combine `name` with `namespace` unless `name` is already qualified.
pub fn qualify(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() && !name.contains('.') => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

/// Split a possibly-qualified name into its simple name and effective namespace.
///
/// The namespace embedded in a qualified name wins over `namespace`.
pub fn split(name: &str, namespace: Option<&str>) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((ns, simple)) => (simple.to_string(), Some(ns.to_string())),
        None => (
            name.to_string(),
            namespace.filter(|ns| !ns.is_empty()).map(String::from),
        ),
    }
}

/// Validate a simple name against Avro naming rules (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// Empty names always fail. Other violations fail only when `strict` is set.
pub fn validate_name(name: &str, context: &str, strict: bool) -> Result<(), BuilderError> {
    if name.is_empty() {
        return Err(BuilderError::InvalidDefinition(format!(
            "{} name cannot be empty",
            context
        )));
    }

    if let Some(problem) = naming_violation(name) {
        let msg = format!("{} name '{}' {}", context, name, problem);
        if strict {
            return Err(BuilderError::InvalidDefinition(msg));
        }
        warn!("{}", msg);
    }

    Ok(())
}

/// Validate every dot-separated component of a namespace.
pub fn validate_namespace(namespace: &str, strict: bool) -> Result<(), BuilderError> {
    for component in namespace.split('.') {
        if component.is_empty() {
            return Err(BuilderError::InvalidDefinition(format!(
                "Namespace '{}' contains an empty component",
                namespace
            )));
        }
        validate_name(component, "Namespace", strict)?;
    }
    Ok(())
}

fn naming_violation(name: &str) -> Option<String> {
    let mut chars = name.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() && first != '_' {
        return Some("must start with a letter or underscore".to_string());
    }
    chars
        .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_')
        .map(|ch| format!("contains invalid character '{}'", ch))
}
