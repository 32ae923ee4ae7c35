//! Builder configuration.
//!
//! `BuilderConfig` carries the settings that apply to one build: where external
//! definitions are searched for, which extra metadata attributes fields and named
//! types may carry, and how the resulting document is validated and rendered.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// What to do with a metadata attribute that is not on the allow-list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttributePolicy {
    /// Fail the definition with `InvalidDefinition`.
    #[default]
    Reject,
    /// Drop the attribute and log a warning.
    Ignore,
}

/// Configuration for a single build.
///
/// # Example
/// ```
/// use avro_builder::BuilderConfig;
///
/// let config = BuilderConfig::new()
///     .with_load_path("schemas")
///     .with_extra_metadata_attributes(["pii", "owner"])
///     .with_pretty(true);
///
/// assert!(config.allows_attribute("pii"));
/// assert!(!config.allows_attribute("other"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Roots searched for external definition files.
    pub load_paths: Vec<PathBuf>,

    /// Extra attribute keys that fields and named types may carry.
    pub extra_metadata_attributes: BTreeSet<String>,

    /// Handling of attributes outside `extra_metadata_attributes` (default: reject).
    pub unknown_attributes: AttributePolicy,

    /// Enforce Avro naming rules on names and namespaces (default: false).
    ///
    /// When disabled, violations are logged and the name is accepted.
    /// Empty names are rejected in either mode.
    pub strict_names: bool,

    /// Indent the rendered document (default: false).
    pub pretty: bool,

    /// File extension of declaration files under the load paths (default: "json").
    pub declaration_extension: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            load_paths: Vec::new(),
            extra_metadata_attributes: BTreeSet::new(),
            unknown_attributes: AttributePolicy::Reject,
            strict_names: false,
            pretty: false,
            declaration_extension: "json".to_string(),
        }
    }
}

impl BuilderConfig {
    /// Create a new `BuilderConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root that will be searched for definitions.
    pub fn with_load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_paths.push(path.into());
        self
    }

    /// Allow additional metadata attributes on fields and named types.
    pub fn with_extra_metadata_attributes<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_metadata_attributes
            .extend(attrs.into_iter().map(Into::into));
        self
    }

    /// Set the policy for attributes that are not allowed.
    pub fn with_unknown_attributes(mut self, policy: AttributePolicy) -> Self {
        self.unknown_attributes = policy;
        self
    }

    /// Enable or disable strict name validation.
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Enable or disable indented output.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set the extension of declaration files.
    pub fn with_declaration_extension(mut self, extension: impl Into<String>) -> Self {
        self.declaration_extension = extension.into();
        self
    }

    /// Whether `key` is on the extra metadata allow-list.
    pub fn allows_attribute(&self, key: &str) -> bool {
        self.extra_metadata_attributes.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_config_default() {
        let config = BuilderConfig::default();
        assert!(config.load_paths.is_empty());
        assert!(config.extra_metadata_attributes.is_empty());
        assert_eq!(config.unknown_attributes, AttributePolicy::Reject);
        assert!(!config.strict_names);
        assert!(!config.pretty);
        assert_eq!(config.declaration_extension, "json");
    }

    #[test]
    fn test_builder_config_setters() {
        let config = BuilderConfig::new()
            .with_load_path("a")
            .with_load_path("b")
            .with_extra_metadata_attributes(["pii"])
            .with_unknown_attributes(AttributePolicy::Ignore)
            .with_strict_names(true)
            .with_declaration_extension("avdl.json");

        assert_eq!(config.load_paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(config.allows_attribute("pii"));
        assert_eq!(config.unknown_attributes, AttributePolicy::Ignore);
        assert!(config.strict_names);
        assert_eq!(config.declaration_extension, "avdl.json");
    }
}
