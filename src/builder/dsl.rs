//! Builder scopes.
//!
//! [`Dsl`] is the top-level scope of a declaration: it tracks the ambient
//! namespace and the last type declared. [`RecordBuilder`] is the scope of a
//! record body, where fields are added and `extends` copies fields in. Both can
//! declare named types through [`DefineTypes`]; types declared inside a record
//! inherit the record's namespace.

use serde_json::Value;
use tracing::debug;

use crate::builder::cache::SchemaCache;
use crate::builder::field::{Field, FieldOptions};
use crate::builder::metadata::HasMetadata;
use crate::builder::name;
use crate::builder::types::{EnumType, FixedType, NamedType, RecordKind, RecordType, TypeRef};
use crate::error::BuilderError;

/// Capability of declaring named types into the cache.
///
/// Every declaration returns a [`TypeRef`] naming the new type, usable as a
/// field type. A declaration that fails is not cached, and neither is any type
/// declared while it was being built.
pub trait DefineTypes {
    /// The cache declarations go to.
    fn scope_cache(&mut self) -> &mut SchemaCache;

    /// Namespace inherited by unqualified declarations.
    fn scope_namespace(&self) -> Option<&str>;

    /// Called after a declaration in this scope is registered.
    fn on_defined(&mut self, _fullname: &str) {}

    fn record<F>(&mut self, name: &str, body: F) -> Result<TypeRef, BuilderError>
    where
        F: FnOnce(&mut RecordBuilder<'_>) -> Result<(), BuilderError>,
    {
        define_record(self, RecordKind::Record, name, body)
    }

    fn error<F>(&mut self, name: &str, body: F) -> Result<TypeRef, BuilderError>
    where
        F: FnOnce(&mut RecordBuilder<'_>) -> Result<(), BuilderError>,
    {
        define_record(self, RecordKind::Error, name, body)
    }

    fn enumeration<I, S, F>(
        &mut self,
        name: &str,
        symbols: I,
        configure: F,
    ) -> Result<TypeRef, BuilderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut EnumType) -> Result<(), BuilderError>,
    {
        let namespace = self.scope_namespace().map(String::from);
        check_strict(self.scope_cache(), name, namespace.as_deref())?;
        let mut enum_type = EnumType::new(name, namespace.as_deref(), symbols)?;
        configure(&mut enum_type)?;
        register(self, NamedType::Enum(enum_type))
    }

    fn fixed<F>(&mut self, name: &str, size: usize, configure: F) -> Result<TypeRef, BuilderError>
    where
        F: FnOnce(&mut FixedType) -> Result<(), BuilderError>,
    {
        let namespace = self.scope_namespace().map(String::from);
        check_strict(self.scope_cache(), name, namespace.as_deref())?;
        let mut fixed = FixedType::new(name, namespace.as_deref(), size)?;
        configure(&mut fixed)?;
        register(self, NamedType::Fixed(fixed))
    }
}

fn check_strict(
    cache: &SchemaCache,
    name: &str,
    namespace: Option<&str>,
) -> Result<(), BuilderError> {
    if !cache.config().strict_names {
        return Ok(());
    }
    let (simple, namespace) = name::split(name, namespace);
    name::validate_name(&simple, "Type", true)?;
    if let Some(ns) = namespace {
        name::validate_namespace(&ns, true)?;
    }
    Ok(())
}

fn register<S: DefineTypes + ?Sized>(
    scope: &mut S,
    named: NamedType,
) -> Result<TypeRef, BuilderError> {
    let registered = scope.scope_cache().register(named)?;
    let fullname = registered.fullname().to_string();
    scope.on_defined(&fullname);
    Ok(TypeRef::Named(fullname))
}

fn define_record<S, F>(
    scope: &mut S,
    kind: RecordKind,
    name: &str,
    body: F,
) -> Result<TypeRef, BuilderError>
where
    S: DefineTypes + ?Sized,
    F: FnOnce(&mut RecordBuilder<'_>) -> Result<(), BuilderError>,
{
    let namespace = scope.scope_namespace().map(String::from);
    check_strict(scope.scope_cache(), name, namespace.as_deref())?;
    let record = RecordType::with_kind(kind, name, namespace.as_deref())?;

    let cache = scope.scope_cache();
    let mark = cache.checkpoint();
    let mut builder = RecordBuilder { cache, record };
    let registered = body(&mut builder).and_then(|()| {
        let RecordBuilder { cache, record } = builder;
        cache.register(NamedType::Record(record))
    });

    match registered {
        Ok(named) => {
            let fullname = named.fullname().to_string();
            scope.on_defined(&fullname);
            Ok(TypeRef::Named(fullname))
        }
        Err(err) => {
            scope.scope_cache().rollback(mark);
            Err(err)
        }
    }
}

/// Top-level declaration scope.
#[derive(Debug)]
pub struct Dsl<'c> {
    cache: &'c mut SchemaCache,
    namespace: Option<String>,
    last_defined: Option<String>,
}

impl<'c> Dsl<'c> {
    pub fn new(cache: &'c mut SchemaCache) -> Self {
        Self {
            cache,
            namespace: None,
            last_defined: None,
        }
    }

    /// Set the namespace for subsequent top-level declarations.
    pub fn namespace(&mut self, namespace: impl Into<String>) -> Result<(), BuilderError> {
        let namespace = namespace.into();
        name::validate_namespace(&namespace, self.cache.config().strict_names)?;
        self.namespace = Some(namespace);
        Ok(())
    }

    pub fn current_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Register `type_ref` under `name`; uses of the name inline the type.
    pub fn type_macro(
        &mut self,
        name: &str,
        type_ref: impl Into<TypeRef>,
    ) -> Result<(), BuilderError> {
        self.cache
            .register_macro(name, self.namespace.as_deref(), type_ref.into())
    }

    /// Fullname of the last top-level named type declared in this scope.
    pub fn last_defined(&self) -> Option<&str> {
        self.last_defined.as_deref()
    }

    pub fn cache(&mut self) -> &mut SchemaCache {
        self.cache
    }
}

impl DefineTypes for Dsl<'_> {
    fn scope_cache(&mut self) -> &mut SchemaCache {
        self.cache
    }

    fn scope_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn on_defined(&mut self, fullname: &str) {
        self.last_defined = Some(fullname.to_string());
    }
}

/// Scope of a record body.
#[derive(Debug)]
pub struct RecordBuilder<'c> {
    cache: &'c mut SchemaCache,
    record: RecordType,
}

impl RecordBuilder<'_> {
    /// The record as built so far.
    pub fn definition(&self) -> &RecordType {
        &self.record
    }

    /// Add a required field, replacing any field with the same name.
    pub fn required(
        &mut self,
        name: &str,
        type_ref: impl Into<TypeRef>,
        options: FieldOptions,
    ) -> Result<(), BuilderError> {
        self.add(name, type_ref.into(), false, options)
    }

    /// Add an optional field (a union with null), replacing any field with the
    /// same name.
    pub fn optional(
        &mut self,
        name: &str,
        type_ref: impl Into<TypeRef>,
        options: FieldOptions,
    ) -> Result<(), BuilderError> {
        self.add(name, type_ref.into(), true, options)
    }

    fn add(
        &mut self,
        name: &str,
        type_ref: TypeRef,
        optional: bool,
        options: FieldOptions,
    ) -> Result<(), BuilderError> {
        let field = Field::from_options(
            name,
            type_ref,
            optional,
            self.record.namespace(),
            options,
            self.cache.config(),
        )?;
        if self.record.add_field(field).is_some() {
            debug!(record = self.record.fullname(), field = name, "field redeclared");
        }
        Ok(())
    }

    /// Copy every field of the named record into this one, resolving the name
    /// in this record's namespace.
    pub fn extends(&mut self, name: &str) -> Result<(), BuilderError> {
        let namespace = self.record.namespace().map(String::from);
        self.extends_in(name, namespace.as_deref())
    }

    /// Copy every field of the named record, resolving the name in `namespace`.
    pub fn extends_in(&mut self, name: &str, namespace: Option<&str>) -> Result<(), BuilderError> {
        let source = self.cache.lookup_named_type(name, namespace)?;
        let record = source.as_record().ok_or_else(|| {
            BuilderError::InvalidDefinition(format!(
                "'{}' cannot extend '{}': it is {} type, not a record",
                self.record.fullname(),
                source.fullname(),
                source.kind()
            ))
        })?;
        debug!(
            record = self.record.fullname(),
            source = record.fullname(),
            fields = record.fields().count(),
            "extending record"
        );
        self.record.merge_fields(record.duplicated_fields());
        Ok(())
    }

    /// Modify a field already in the record, including one copied by `extends`.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.record.field_mut(name)
    }

    pub fn doc(&mut self, doc: impl Into<String>) {
        self.record.set_doc(doc);
    }

    pub fn aliases<I, S>(&mut self, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.set_aliases(aliases);
    }

    pub fn logical_type(&mut self, logical_type: impl Into<String>) {
        self.record.set_logical_type(logical_type);
    }

    /// Mark the record as only meant to be extended.
    pub fn set_abstract(&mut self, is_abstract: bool) {
        self.record.set_abstract(is_abstract);
    }

    /// Set an extra attribute on the record, subject to the allow-list.
    pub fn attribute(&mut self, key: &str, value: Value) -> Result<(), BuilderError> {
        self.record.set_attribute(self.cache.config(), key, value)
    }

    /// Declare a record named after `field_name` in this record's namespace.
    pub fn anonymous_record<F>(&mut self, field_name: &str, body: F) -> Result<TypeRef, BuilderError>
    where
        F: FnOnce(&mut RecordBuilder<'_>) -> Result<(), BuilderError>,
    {
        self.record(&anonymous_name(field_name, "record"), body)
    }

    pub fn anonymous_enum<I, S, F>(
        &mut self,
        field_name: &str,
        symbols: I,
        configure: F,
    ) -> Result<TypeRef, BuilderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut EnumType) -> Result<(), BuilderError>,
    {
        self.enumeration(&anonymous_name(field_name, "enum"), symbols, configure)
    }

    pub fn anonymous_fixed<F>(
        &mut self,
        field_name: &str,
        size: usize,
        configure: F,
    ) -> Result<TypeRef, BuilderError>
    where
        F: FnOnce(&mut FixedType) -> Result<(), BuilderError>,
    {
        self.fixed(&anonymous_name(field_name, "fixed"), size, configure)
    }
}

impl DefineTypes for RecordBuilder<'_> {
    fn scope_cache(&mut self) -> &mut SchemaCache {
        self.cache
    }

    fn scope_namespace(&self) -> Option<&str> {
        self.record.namespace()
    }
}

/// Generated name of a type declared inline for a field without a name.
pub fn anonymous_name(field_name: &str, kind: &str) -> String {
    format!("__{}_{}", field_name, kind)
}
