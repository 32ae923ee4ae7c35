//! External definition resolution.
//!
//! When the cache misses on a fullname it asks a [`DefinitionLoader`] for a
//! [`Declaration`] of that name and evaluates it against itself.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::builder::cache::SchemaCache;
use crate::builder::dsl::Dsl;
use crate::config::BuilderConfig;
use crate::declaration;
use crate::error::BuilderError;

type DeclareFn = dyn FnOnce(&mut Dsl<'_>) -> Result<(), BuilderError>;

/// A deferred sequence of builder calls.
pub struct Declaration {
    origin: String,
    declare: Box<DeclareFn>,
}

impl Declaration {
    pub fn new<F>(origin: impl Into<String>, declare: F) -> Self
    where
        F: FnOnce(&mut Dsl<'_>) -> Result<(), BuilderError> + 'static,
    {
        Self {
            origin: origin.into(),
            declare: Box::new(declare),
        }
    }

    /// A declaration in the JSON declaration format.
    pub fn from_json(origin: impl Into<String>, value: Value) -> Self {
        let origin = origin.into();
        let source = origin.clone();
        Self::new(origin, move |dsl| declaration::evaluate(dsl, &value, &source))
    }

    /// Parse JSON declaration text.
    pub fn from_json_str(origin: impl Into<String>, text: &str) -> Result<Self, BuilderError> {
        let origin = origin.into();
        let value = declaration::parse(text, &origin)?;
        Ok(Self::from_json(origin, value))
    }

    /// Where the declaration came from, for diagnostics.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Run the declaration in a fresh top-level scope over `cache`.
    ///
    /// Returns the fullname of the last top-level type it declared.
    pub fn evaluate(self, cache: &mut SchemaCache) -> Result<Option<String>, BuilderError> {
        let mut dsl = Dsl::new(cache);
        (self.declare)(&mut dsl)?;
        Ok(dsl.last_defined().map(String::from))
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("origin", &self.origin)
            .finish()
    }
}

/// Finds the declaration of a named type that is not yet in the cache.
pub trait DefinitionLoader {
    /// Return the declaration for `fullname`, or `None` if there is none.
    fn load(
        &self,
        fullname: &str,
        config: &BuilderConfig,
    ) -> Result<Option<Declaration>, BuilderError>;
}

type SharedDeclareFn = dyn Fn(&mut Dsl<'_>) -> Result<(), BuilderError>;

/// In-memory declarations keyed by fullname.
#[derive(Default, Clone)]
pub struct DeclarationLibrary {
    declarations: HashMap<String, Rc<SharedDeclareFn>>,
}

impl DeclarationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the declaration that defines `fullname`.
    pub fn insert<F>(&mut self, fullname: impl Into<String>, declare: F)
    where
        F: Fn(&mut Dsl<'_>) -> Result<(), BuilderError> + 'static,
    {
        self.declarations.insert(fullname.into(), Rc::new(declare));
    }

    pub fn contains(&self, fullname: &str) -> bool {
        self.declarations.contains_key(fullname)
    }
}

impl DefinitionLoader for DeclarationLibrary {
    fn load(
        &self,
        fullname: &str,
        _config: &BuilderConfig,
    ) -> Result<Option<Declaration>, BuilderError> {
        Ok(self.declarations.get(fullname).map(|declare| {
            let declare = Rc::clone(declare);
            Declaration::new(format!("library:{}", fullname), move |dsl| declare(dsl))
        }))
    }
}

impl fmt::Debug for DeclarationLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarationLibrary")
            .field("declarations", &self.declarations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Loads JSON declaration files from a set of search roots.
///
/// `a.b.Name` maps to `<root>/a/b/Name.<ext>`; if no root has that file, the
/// single `<root>/**/Name.<ext>` match across all roots is used.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    roots: Vec<PathBuf>,
    extension: String,
}

impl FileSystemLoader {
    pub fn new<I, P>(roots: I, extension: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &BuilderConfig) -> Self {
        Self::new(
            config.load_paths.iter().cloned(),
            config.declaration_extension.clone(),
        )
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Locate the declaration file for `fullname`.
    pub fn find(&self, fullname: &str) -> Result<Option<PathBuf>, BuilderError> {
        let (namespace, simple) = match fullname.rsplit_once('.') {
            Some((ns, simple)) => (Some(ns), simple),
            None => (None, fullname),
        };
        let file_name = format!("{}.{}", simple, self.extension);

        for root in &self.roots {
            let mut candidate = root.clone();
            if let Some(ns) = namespace {
                candidate.extend(ns.split('.'));
            }
            candidate.push(&file_name);
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }

        let mut matches = Vec::new();
        for root in &self.roots {
            matches.extend(self.glob_matches(root, &file_name)?);
        }
        matches.sort();
        matches.dedup();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(BuilderError::evaluation(
                fullname,
                format!(
                    "multiple definitions found: {}",
                    matches
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }

    fn glob_matches(&self, root: &Path, file_name: &str) -> Result<Vec<PathBuf>, BuilderError> {
        let escaped = glob::Pattern::escape(&root.to_string_lossy());
        let pattern = Path::new(&escaped)
            .join("**")
            .join(glob::Pattern::escape(file_name));
        let pattern = pattern.to_string_lossy();
        let entries = glob::glob(&pattern).map_err(|e| {
            BuilderError::evaluation(
                root.display().to_string(),
                format!("invalid search pattern '{}': {}", pattern, e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "skipping unreadable path"),
            }
        }
        Ok(paths)
    }
}

impl DefinitionLoader for FileSystemLoader {
    fn load(
        &self,
        fullname: &str,
        _config: &BuilderConfig,
    ) -> Result<Option<Declaration>, BuilderError> {
        let Some(path) = self.find(fullname)? else {
            return Ok(None);
        };
        let origin = path.display().to_string();
        debug!(fullname, path = %origin, "found definition file");
        let text = fs::read_to_string(&path)
            .map_err(|e| BuilderError::evaluation(origin.clone(), e.to_string()))?;
        Declaration::from_json_str(origin, &text).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_by_namespace_path() {
        let dir = tempdir().unwrap();
        let ns_dir = dir.path().join("com").join("example");
        fs::create_dir_all(&ns_dir).unwrap();
        fs::write(ns_dir.join("Person.json"), "{}").unwrap();

        let loader = FileSystemLoader::new([dir.path()], "json");
        assert_eq!(
            loader.find("com.example.Person").unwrap(),
            Some(ns_dir.join("Person.json"))
        );
    }

    #[test]
    fn test_find_by_search() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("anywhere").join("deeper");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Person.json"), "{}").unwrap();

        let loader = FileSystemLoader::new([dir.path()], "json");
        assert_eq!(
            loader.find("com.example.Person").unwrap(),
            Some(nested.join("Person.json"))
        );
        assert_eq!(loader.find("com.example.Missing").unwrap(), None);
    }

    #[test]
    fn test_find_by_search_under_root_with_glob_characters() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("defs[v1]*?");
        let nested = root.join("deeper");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Person.json"), "{}").unwrap();

        let loader = FileSystemLoader::new([&root], "json");
        assert_eq!(
            loader.find("com.example.Person").unwrap(),
            Some(nested.join("Person.json"))
        );
    }

    #[test]
    fn test_find_ambiguous() {
        let dir = tempdir().unwrap();
        for sub in ["a", "b"] {
            let path = dir.path().join(sub);
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("Person.json"), "{}").unwrap();
        }

        let loader = FileSystemLoader::new([dir.path()], "json");
        assert!(matches!(
            loader.find("Person"),
            Err(BuilderError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_library_returns_none_for_unknown() {
        let library = DeclarationLibrary::new();
        assert!(library
            .load("ns.Unknown", &BuilderConfig::default())
            .unwrap()
            .is_none());
    }
}
