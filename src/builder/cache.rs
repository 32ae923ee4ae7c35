//! The named type registry.
//!
//! `SchemaCache` maps fullnames to the canonical instance of each named type
//! (and to type macros). Lookups that miss are resolved through the configured
//! [`DefinitionLoader`], whose declaration is evaluated against this same cache
//! and memoized. One cache belongs to one build; it is not meant to be shared
//! between concurrent builds.

use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::builder::loader::{DefinitionLoader, FileSystemLoader};
use crate::builder::name;
use crate::builder::types::{NamedType, TypeRef};
use crate::config::BuilderConfig;
use crate::error::BuilderError;

/// An entry in the cache.
#[derive(Debug, Clone)]
pub enum CachedType {
    /// A record, enum, or fixed.
    Named(Rc<NamedType>),
    /// A type registered under a name and inlined wherever the name is used.
    Macro {
        fullname: String,
        namespace: Option<String>,
        type_ref: TypeRef,
    },
}

impl CachedType {
    pub fn fullname(&self) -> &str {
        match self {
            CachedType::Named(named) => named.fullname(),
            CachedType::Macro { fullname, .. } => fullname,
        }
    }
}

/// Registry of named types for one build.
pub struct SchemaCache {
    config: BuilderConfig,
    loader: Option<Rc<dyn DefinitionLoader>>,
    entries: IndexMap<String, CachedType>,
    loading: HashSet<String>,
}

impl SchemaCache {
    /// Create a cache. When the config has load paths, missing definitions are
    /// searched for there.
    pub fn new(config: BuilderConfig) -> Self {
        let loader: Option<Rc<dyn DefinitionLoader>> = if config.load_paths.is_empty() {
            None
        } else {
            Some(Rc::new(FileSystemLoader::from_config(&config)))
        };
        Self {
            config,
            loader,
            entries: IndexMap::new(),
            loading: HashSet::new(),
        }
    }

    /// Create a cache that resolves missing definitions through `loader`.
    pub fn with_loader(config: BuilderConfig, loader: impl DefinitionLoader + 'static) -> Self {
        Self {
            config,
            loader: Some(Rc::new(loader)),
            entries: IndexMap::new(),
            loading: HashSet::new(),
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, fullname: &str) -> bool {
        self.entries.contains_key(fullname)
    }

    pub fn get(&self, fullname: &str) -> Option<&CachedType> {
        self.entries.get(fullname)
    }

    /// Registered fullnames in registration order.
    pub fn fullnames(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Register a named type under its fullname.
    pub fn register(&mut self, named: NamedType) -> Result<Rc<NamedType>, BuilderError> {
        let fullname = named.fullname().to_string();
        if self.entries.contains_key(&fullname) {
            return Err(BuilderError::DuplicateDefinition(fullname));
        }
        debug!(fullname = %fullname, kind = named.kind(), "registered named type");
        let named = Rc::new(named);
        self.entries
            .insert(fullname, CachedType::Named(Rc::clone(&named)));
        Ok(named)
    }

    /// Register a type macro under `name` qualified by `namespace`.
    pub fn register_macro(
        &mut self,
        name: &str,
        namespace: Option<&str>,
        type_ref: TypeRef,
    ) -> Result<(), BuilderError> {
        let (simple, namespace) = name::split(name, namespace);
        name::validate_name(&simple, "Type macro", self.config.strict_names)?;
        let fullname = name::qualify(&simple, namespace.as_deref());
        if self.entries.contains_key(&fullname) {
            return Err(BuilderError::DuplicateDefinition(fullname));
        }
        debug!(fullname = %fullname, "registered type macro");
        self.entries.insert(
            fullname.clone(),
            CachedType::Macro {
                fullname,
                namespace,
                type_ref,
            },
        );
        Ok(())
    }

    /// Resolve a named type, loading its definition on a miss.
    ///
    /// Type macros are not named types and do not resolve here.
    pub fn lookup_named_type(
        &mut self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Rc<NamedType>, BuilderError> {
        match self.resolve(name, namespace)? {
            CachedType::Named(named) => Ok(named),
            CachedType::Macro { .. } => Err(BuilderError::unresolved(name, namespace)),
        }
    }

    /// Resolve a name to a cache entry.
    ///
    /// An unqualified name is tried in `namespace` first and then without a
    /// namespace. Each candidate is looked up in the cache, then loaded.
    pub fn resolve(
        &mut self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<CachedType, BuilderError> {
        let qualified = name::qualify(name, namespace);
        if let Some(found) = self.find_or_load(&qualified)? {
            return Ok(found);
        }
        if qualified != name {
            if let Some(found) = self.find_or_load(name)? {
                return Ok(found);
            }
        }
        Err(BuilderError::unresolved(name, namespace))
    }

    fn find_or_load(&mut self, fullname: &str) -> Result<Option<CachedType>, BuilderError> {
        if let Some(entry) = self.entries.get(fullname) {
            return Ok(Some(entry.clone()));
        }
        debug!(fullname, "cache miss");
        if !self.load(fullname)? {
            return Ok(None);
        }
        Ok(self.entries.get(fullname).cloned())
    }

    /// Evaluate the external definition of `fullname`, if the loader has one.
    fn load(&mut self, fullname: &str) -> Result<bool, BuilderError> {
        let Some(loader) = self.loader.clone() else {
            return Ok(false);
        };
        if !self.loading.insert(fullname.to_string()) {
            debug!(fullname, "definition requires itself while loading");
            return Ok(false);
        }

        let result = self.evaluate_external(loader.as_ref(), fullname);
        self.loading.remove(fullname);
        result
    }

    fn evaluate_external(
        &mut self,
        loader: &dyn DefinitionLoader,
        fullname: &str,
    ) -> Result<bool, BuilderError> {
        let Some(declaration) = loader.load(fullname, &self.config)? else {
            return Ok(false);
        };
        debug!(fullname, origin = declaration.origin(), "loading external definition");

        let mark = self.checkpoint();
        if let Err(err) = declaration.evaluate(self) {
            self.rollback(mark);
            return Err(err);
        }
        if !self.entries.contains_key(fullname) {
            debug!(fullname, "external definition did not declare the requested type");
            return Ok(false);
        }
        Ok(true)
    }

    /// Current registration position, for [`SchemaCache::rollback`].
    pub(crate) fn checkpoint(&self) -> usize {
        self.entries.len()
    }

    /// Drop every entry registered after `mark`.
    pub(crate) fn rollback(&mut self, mark: usize) {
        if self.entries.len() > mark {
            debug!(dropped = self.entries.len() - mark, "rolling back registrations");
            self.entries.truncate(mark);
        }
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}
