//! Memoized schema documents for the definitions under one directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::api::SchemaBuilder;
use crate::builder::name;
use crate::config::BuilderConfig;
use crate::error::BuilderError;

/// Finds definition files under a root directory and caches the document built
/// for each fullname.
///
/// Every miss builds in a fresh [`SchemaBuilder`], so each stored document is
/// self-contained: it defines every named type it uses.
#[derive(Debug)]
pub struct SchemaStore {
    root: PathBuf,
    config: BuilderConfig,
    schemas: HashMap<String, Value>,
}

impl SchemaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, BuilderConfig::default())
    }

    /// Use `config` for every build; `root` is searched before its load paths.
    pub fn with_config(root: impl Into<PathBuf>, config: BuilderConfig) -> Self {
        Self {
            root: root.into(),
            config,
            schemas: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The document for `name` in `namespace`, building it on first request.
    ///
    /// Abstract records only exist to be extended and are refused.
    pub fn find(&mut self, name: &str, namespace: Option<&str>) -> Result<&Value, BuilderError> {
        let fullname = name::qualify(name, namespace);
        if !self.schemas.contains_key(&fullname) {
            let document = self.build(&fullname)?;
            self.schemas.insert(fullname.clone(), document);
        } else {
            debug!(fullname = %fullname, "schema store hit");
        }
        self.schemas
            .get(&fullname)
            .ok_or_else(|| BuilderError::unresolved(name, namespace))
    }

    /// Number of documents built so far.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn build(&self, fullname: &str) -> Result<Value, BuilderError> {
        let mut config = self.config.clone();
        config.load_paths.insert(0, self.root.clone());

        debug!(fullname, root = %self.root.display(), "building schema for store");
        let mut builder = SchemaBuilder::new(config);
        let named = builder.lookup_named_type(fullname, None)?;
        if named.as_record().is_some_and(|record| record.is_abstract()) {
            return Err(BuilderError::evaluation(
                fullname,
                "abstract record has no schema of its own",
            ));
        }
        builder.serialize(fullname, None)
    }
}
