//! JSON declaration front-end.
//!
//! Evaluates a structured declaration into builder calls. A declaration is
//! either a single type declaration or `{"namespace": ..., "types": [...]}`:
//!
//! ```json
//! {
//!   "namespace": "com.example",
//!   "types": [
//!     {"record": "Base", "abstract": true, "fields": [
//!       {"required": "id", "type": "long"}
//!     ]},
//!     {"record": "Person", "fields": [
//!       {"extends": "Base"},
//!       {"required": "name", "type": "string"},
//!       {"optional": "age", "type": "int"},
//!       {"required": "tags", "type": {"array": "string"}},
//!       {"optional": "address", "type": {"record": null, "fields": [
//!         {"required": "city", "type": "string"}
//!       ]}}
//!     ]}
//!   ]
//! }
//! ```
//!
//! Record members are applied in order, so the position of `extends` decides
//! which declaration of a field wins. Unrecognized keys on records, enums,
//! fixed types, and fields are extra metadata attributes.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::builder::{
    anonymous_name, DefineTypes, Dsl, FieldOptions, FieldOrder, HasMetadata, PrimitiveType,
    RecordBuilder, TypeRef,
};
use crate::config::BuilderConfig;
use crate::error::BuilderError;

const RECORD_KEYS: &[&str] = &[
    "record",
    "error",
    "namespace",
    "doc",
    "aliases",
    "logicalType",
    "abstract",
    "fields",
];
const ENUM_KEYS: &[&str] = &[
    "enum",
    "namespace",
    "symbols",
    "default",
    "doc",
    "aliases",
    "logicalType",
];
const FIXED_KEYS: &[&str] = &[
    "fixed",
    "namespace",
    "size",
    "doc",
    "aliases",
    "logicalType",
    "precision",
    "scale",
];
const FIELD_KEYS: &[&str] = &[
    "required",
    "optional",
    "type",
    "default",
    "doc",
    "aliases",
    "order",
    "namespace",
];

/// Parse declaration text.
pub fn parse(text: &str, origin: &str) -> Result<Value, BuilderError> {
    serde_json::from_str(text)
        .map_err(|e| BuilderError::evaluation(origin, format!("invalid JSON: {}", e)))
}

/// Evaluate a parsed declaration in `dsl`.
pub fn evaluate(dsl: &mut Dsl<'_>, value: &Value, origin: &str) -> Result<(), BuilderError> {
    let evaluator = Evaluator {
        origin,
        config: dsl.cache().config().clone(),
    };
    let obj = evaluator.object(value, "declaration")?;

    match obj.get("types") {
        Some(types) => {
            if let Some(ns) = obj.get("namespace") {
                dsl.namespace(evaluator.string(ns, "namespace")?)?;
            }
            let types = types
                .as_array()
                .ok_or_else(|| evaluator.error("'types' must be an array"))?;
            for declaration in types {
                evaluator.top_level(dsl, declaration)?;
            }
            Ok(())
        }
        None => evaluator.top_level(dsl, value),
    }
}

struct Evaluator<'a> {
    origin: &'a str,
    config: BuilderConfig,
}

impl Evaluator<'_> {
    fn error(&self, message: impl Into<String>) -> BuilderError {
        BuilderError::evaluation(self.origin, message)
    }

    fn object<'v>(&self, value: &'v Value, what: &str) -> Result<&'v Map<String, Value>, BuilderError> {
        value
            .as_object()
            .ok_or_else(|| self.error(format!("{} must be an object, found: {}", what, value)))
    }

    fn string<'v>(&self, value: &'v Value, what: &str) -> Result<&'v str, BuilderError> {
        value
            .as_str()
            .ok_or_else(|| self.error(format!("'{}' must be a string, found: {}", what, value)))
    }

    fn strings(&self, value: &Value, what: &str) -> Result<Vec<String>, BuilderError> {
        value
            .as_array()
            .ok_or_else(|| self.error(format!("'{}' must be an array of strings", what)))?
            .iter()
            .map(|v| self.string(v, what).map(String::from))
            .collect()
    }

    fn top_level(&self, dsl: &mut Dsl<'_>, value: &Value) -> Result<(), BuilderError> {
        let obj = self.object(value, "type declaration")?;
        if let Some(name) = obj.get("type_macro") {
            let name = self.string(name, "type_macro")?;
            let ty = obj
                .get("type")
                .ok_or_else(|| self.error(format!("type macro '{}' is missing 'type'", name)))?;
            let ty = self.type_ref(dsl, ty, name)?;
            return dsl.type_macro(name, ty);
        }
        self.named_type(dsl, obj, None).map(|_| ())
    }

    /// Declare a record, error, enum, or fixed. `field` names anonymous types.
    fn named_type<S: DefineTypes>(
        &self,
        scope: &mut S,
        obj: &Map<String, Value>,
        field: Option<&str>,
    ) -> Result<TypeRef, BuilderError> {
        let (kind, name_value) = ["record", "error", "enum", "fixed"]
            .into_iter()
            .find_map(|kind| obj.get(kind).map(|v| (kind, v)))
            .ok_or_else(|| {
                self.error("type declaration needs one of 'record', 'error', 'enum', 'fixed'")
            })?;

        let name = match name_value {
            Value::Null => match field {
                Some(field) => anonymous_name(field, kind),
                None => return Err(self.error(format!("top-level {} must have a name", kind))),
            },
            other => self.string(other, kind)?.to_string(),
        };
        let name = match obj.get("namespace") {
            Some(ns) if !name.contains('.') => {
                format!("{}.{}", self.string(ns, "namespace")?, name)
            }
            _ => name,
        };

        match kind {
            "record" => scope.record(&name, |r| self.record_body(r, obj)),
            "error" => scope.error(&name, |r| self.record_body(r, obj)),
            "enum" => self.enum_type(scope, &name, obj),
            _ => self.fixed_type(scope, &name, obj),
        }
    }

    fn record_body(
        &self,
        r: &mut RecordBuilder<'_>,
        obj: &Map<String, Value>,
    ) -> Result<(), BuilderError> {
        if let Some(doc) = obj.get("doc") {
            r.doc(self.string(doc, "doc")?);
        }
        if let Some(aliases) = obj.get("aliases") {
            r.aliases(self.strings(aliases, "aliases")?);
        }
        if let Some(logical_type) = obj.get("logicalType") {
            r.logical_type(self.string(logical_type, "logicalType")?);
        }
        if let Some(is_abstract) = obj.get("abstract") {
            let is_abstract = is_abstract
                .as_bool()
                .ok_or_else(|| self.error("'abstract' must be a boolean"))?;
            r.set_abstract(is_abstract);
        }
        for (key, value) in obj {
            if !RECORD_KEYS.contains(&key.as_str()) {
                r.attribute(key, value.clone())?;
            }
        }

        let members = match obj.get("fields") {
            Some(fields) => fields
                .as_array()
                .ok_or_else(|| self.error("'fields' must be an array"))?
                .as_slice(),
            None => &[],
        };
        for member in members {
            self.member(r, member)?;
        }
        Ok(())
    }

    fn member(&self, r: &mut RecordBuilder<'_>, value: &Value) -> Result<(), BuilderError> {
        let obj = self.object(value, "record member")?;

        if let Some(source) = obj.get("extends") {
            let source = self.string(source, "extends")?;
            return match obj.get("namespace") {
                Some(ns) => r.extends_in(source, Some(self.string(ns, "namespace")?)),
                None => r.extends(source),
            };
        }

        let (name, optional) = match (obj.get("required"), obj.get("optional")) {
            (Some(name), None) => (self.string(name, "required")?, false),
            (None, Some(name)) => (self.string(name, "optional")?, true),
            _ => {
                return Err(self.error(
                    "record member needs exactly one of 'required', 'optional', 'extends'",
                ))
            }
        };

        let ty = obj
            .get("type")
            .ok_or_else(|| self.error(format!("field '{}' is missing 'type'", name)))?;
        let ty = self.type_ref(r, ty, name)?;
        let options = self.field_options(obj)?;

        if optional {
            r.optional(name, ty, options)
        } else {
            r.required(name, ty, options)
        }
    }

    fn field_options(&self, obj: &Map<String, Value>) -> Result<FieldOptions, BuilderError> {
        let mut options = FieldOptions::new();
        if let Some(doc) = obj.get("doc") {
            options.doc = Some(self.string(doc, "doc")?.to_string());
        }
        if let Some(aliases) = obj.get("aliases") {
            options.aliases = self.strings(aliases, "aliases")?;
        }
        options.default = obj.get("default").cloned();
        if let Some(order) = obj.get("order") {
            let order = self.string(order, "order")?;
            options.order = Some(
                FieldOrder::from_name(order)
                    .ok_or_else(|| self.error(format!("unknown field order '{}'", order)))?,
            );
        }
        if let Some(ns) = obj.get("namespace") {
            options.namespace = Some(self.string(ns, "namespace")?.to_string());
        }
        for (key, value) in obj {
            if !FIELD_KEYS.contains(&key.as_str()) {
                options.attributes.insert(key.clone(), value.clone());
            }
        }
        Ok(options)
    }

    /// Convert a type expression; nested named types are declared in `scope`.
    fn type_ref<S: DefineTypes>(
        &self,
        scope: &mut S,
        value: &Value,
        field: &str,
    ) -> Result<TypeRef, BuilderError> {
        match value {
            Value::String(name) => Ok(TypeRef::from(name.as_str())),
            Value::Array(branches) => branches
                .iter()
                .map(|branch| self.type_ref(scope, branch, field))
                .collect::<Result<Vec<_>, _>>()
                .map(TypeRef::Union),
            Value::Object(obj) => {
                if let Some(items) = obj.get("array") {
                    return Ok(TypeRef::array(self.type_ref(scope, items, field)?));
                }
                if let Some(values) = obj.get("map") {
                    return Ok(TypeRef::map(self.type_ref(scope, values, field)?));
                }
                if let Some(base) = obj.get("type") {
                    return self.annotated(obj, base);
                }
                self.named_type(scope, obj, Some(field))
            }
            other => Err(self.error(format!("invalid type expression: {}", other))),
        }
    }

    fn annotated(&self, obj: &Map<String, Value>, base: &Value) -> Result<TypeRef, BuilderError> {
        let base = self.string(base, "type")?;
        let primitive = PrimitiveType::from_name(base)
            .ok_or_else(|| self.error(format!("'{}' is not a primitive type", base)))?;
        let attributes: IndexMap<String, Value> = obj
            .iter()
            .filter(|(key, _)| key.as_str() != "type")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if attributes.is_empty() {
            return Ok(TypeRef::Primitive(primitive));
        }
        Ok(TypeRef::Annotated {
            primitive,
            attributes,
        })
    }

    fn enum_type<S: DefineTypes>(
        &self,
        scope: &mut S,
        name: &str,
        obj: &Map<String, Value>,
    ) -> Result<TypeRef, BuilderError> {
        let symbols = obj
            .get("symbols")
            .ok_or_else(|| self.error(format!("enum '{}' is missing 'symbols'", name)))?;
        let symbols = self.strings(symbols, "symbols")?;

        scope.enumeration(name, symbols, |e| {
            if let Some(default) = obj.get("default") {
                e.set_default(self.string(default, "default")?)?;
            }
            self.apply_metadata(e, obj, ENUM_KEYS)
        })
    }

    fn fixed_type<S: DefineTypes>(
        &self,
        scope: &mut S,
        name: &str,
        obj: &Map<String, Value>,
    ) -> Result<TypeRef, BuilderError> {
        let size = obj
            .get("size")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                self.error(format!("fixed '{}' needs a non-negative integer 'size'", name))
            })?;
        let size = usize::try_from(size)
            .map_err(|_| self.error(format!("fixed '{}' size {} is too large", name, size)))?;

        scope.fixed(name, size, |f| {
            match (obj.get("precision"), obj.get("scale")) {
                (Some(precision), scale) => {
                    let precision = self.u32(precision, "precision")?;
                    let scale = scale.map(|s| self.u32(s, "scale")).transpose()?.unwrap_or(0);
                    f.set_decimal(precision, scale);
                }
                (None, Some(_)) => return Err(self.error("'scale' requires 'precision'")),
                (None, None) => {}
            }
            self.apply_metadata(f, obj, FIXED_KEYS)
        })
    }

    fn u32(&self, value: &Value, what: &str) -> Result<u32, BuilderError> {
        value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.error(format!("'{}' must be a non-negative integer", what)))
    }

    /// Apply doc, aliases, logicalType, and extra attributes.
    fn apply_metadata<T: HasMetadata>(
        &self,
        target: &mut T,
        obj: &Map<String, Value>,
        known: &[&str],
    ) -> Result<(), BuilderError> {
        if let Some(doc) = obj.get("doc") {
            target.set_doc(self.string(doc, "doc")?);
        }
        if let Some(aliases) = obj.get("aliases") {
            target.set_aliases(self.strings(aliases, "aliases")?);
        }
        if let Some(logical_type) = obj.get("logicalType") {
            target.set_logical_type(self.string(logical_type, "logicalType")?);
        }
        for (key, value) in obj {
            if !known.contains(&key.as_str()) {
                target.set_attribute(&self.config, key, value.clone())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ReferenceState, SchemaCache};
    use serde_json::json;

    fn evaluate_to_cache(value: Value, config: BuilderConfig) -> Result<SchemaCache, BuilderError> {
        let mut cache = SchemaCache::new(config);
        let mut dsl = Dsl::new(&mut cache);
        evaluate(&mut dsl, &value, "test")?;
        Ok(cache)
    }

    fn document(cache: &mut SchemaCache, fullname: &str) -> Value {
        let root = cache.lookup_named_type(fullname, None).unwrap();
        root.to_document(cache, &mut ReferenceState::new()).unwrap()
    }

    #[test]
    fn test_single_record_declaration() {
        let mut cache = evaluate_to_cache(
            json!({
                "record": "Person",
                "namespace": "ns",
                "doc": "A person",
                "fields": [
                    {"required": "name", "type": "string"},
                    {"optional": "age", "type": "int"}
                ]
            }),
            BuilderConfig::default(),
        )
        .unwrap();

        assert_eq!(
            document(&mut cache, "ns.Person"),
            json!({
                "type": "record",
                "name": "Person",
                "namespace": "ns",
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "age", "type": ["null", "int"], "default": null}
                ],
                "doc": "A person"
            })
        );
    }

    #[test]
    fn test_nested_and_composite_types() {
        let mut cache = evaluate_to_cache(
            json!({
                "namespace": "ns",
                "types": [
                    {"type_macro": "ts", "type": {"type": "long", "logicalType": "timestamp-micros"}},
                    {"record": "Order", "fields": [
                        {"required": "at", "type": "ts"},
                        {"required": "lines", "type": {"array": {"record": "Line", "fields": [
                            {"required": "sku", "type": "string"}
                        ]}}},
                        {"required": "status", "type": {"enum": null, "symbols": ["OPEN", "DONE"], "default": "OPEN"}},
                        {"required": "digest", "type": {"fixed": "Digest", "size": 4}},
                        {"required": "by_sku", "type": {"map": "Line"}},
                        {"optional": "note", "type": ["string", "bytes"]}
                    ]}
                ]
            }),
            BuilderConfig::default(),
        )
        .unwrap();

        assert!(cache.contains("ns.__status_enum"));
        let doc = document(&mut cache, "ns.Order");
        assert_eq!(
            doc["fields"],
            json!([
                {"name": "at", "type": {"type": "long", "logicalType": "timestamp-micros"}},
                {"name": "lines", "type": {"type": "array", "items": {
                    "type": "record", "name": "Line", "namespace": "ns",
                    "fields": [{"name": "sku", "type": "string"}]
                }}},
                {"name": "status", "type": {
                    "type": "enum", "name": "__status_enum", "namespace": "ns",
                    "symbols": ["OPEN", "DONE"], "default": "OPEN"
                }},
                {"name": "digest", "type": {"type": "fixed", "name": "Digest", "namespace": "ns", "size": 4}},
                {"name": "by_sku", "type": {"type": "map", "values": "ns.Line"}},
                {"name": "note", "type": ["null", "string", "bytes"], "default": null}
            ])
        );
    }

    #[test]
    fn test_extends_member_order() {
        let mut cache = evaluate_to_cache(
            json!({"types": [
                {"record": "Base", "fields": [
                    {"required": "id", "type": "long"},
                    {"required": "label", "type": "string"}
                ]},
                {"record": "Early", "fields": [
                    {"extends": "Base"},
                    {"optional": "label", "type": "bytes"}
                ]},
                {"record": "Late", "fields": [
                    {"optional": "label", "type": "bytes"},
                    {"extends": "Base"}
                ]}
            ]}),
            BuilderConfig::default(),
        )
        .unwrap();

        let early = document(&mut cache, "Early");
        assert_eq!(early["fields"][1], json!({"name": "label", "type": ["null", "bytes"], "default": null}));

        let late = document(&mut cache, "Late");
        assert_eq!(late["fields"][0], json!({"name": "label", "type": "string"}));
        assert_eq!(late["fields"][1], json!({"name": "id", "type": "long"}));
    }

    #[test]
    fn test_extra_attributes() {
        let config = BuilderConfig::new().with_extra_metadata_attributes(["owner", "pii"]);
        let mut cache = evaluate_to_cache(
            json!({"record": "Tagged", "owner": "team-a", "fields": [
                {"required": "email", "type": "string", "pii": true, "order": "ignore"}
            ]}),
            config,
        )
        .unwrap();

        assert_eq!(
            document(&mut cache, "Tagged"),
            json!({
                "type": "record",
                "name": "Tagged",
                "fields": [{"name": "email", "type": "string", "order": "ignore", "pii": true}],
                "owner": "team-a"
            })
        );

        let err = evaluate_to_cache(
            json!({"record": "Tagged", "owner": "team-a", "fields": []}),
            BuilderConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BuilderError::InvalidDefinition(_)));
    }

    #[test]
    fn test_malformed_declarations() {
        let cases = [
            json!([]),
            json!({"fields": []}),
            json!({"record": "R", "fields": [{"name": "x", "type": "int"}]}),
            json!({"record": "R", "fields": [{"required": "x"}]}),
            json!({"record": "R", "fields": [{"required": "x", "type": 5}]}),
            json!({"record": "R", "fields": [{"required": "x", "type": "int", "order": "sideways"}]}),
            json!({"record": null, "fields": []}),
            json!({"fixed": "F", "size": -1}),
        ];
        for case in cases {
            let err = evaluate_to_cache(case.clone(), BuilderConfig::default()).unwrap_err();
            assert!(
                matches!(err, BuilderError::Evaluation { .. }),
                "expected evaluation error for {}: {:?}",
                case,
                err
            );
        }
    }

    #[test]
    fn test_structural_errors_surface_as_invalid_definition() {
        let cases = [
            json!({"enum": "E", "symbols": ["A", "A"]}),
            json!({"enum": "E", "symbols": ["A"], "default": "B"}),
            json!({"fixed": "F", "size": 0}),
            json!({"record": "", "fields": []}),
        ];
        for case in cases {
            let err = evaluate_to_cache(case.clone(), BuilderConfig::default()).unwrap_err();
            assert!(
                matches!(err, BuilderError::InvalidDefinition(_)),
                "expected invalid definition for {}: {:?}",
                case,
                err
            );
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            parse("{not json", "broken.json"),
            Err(BuilderError::Evaluation { ref origin, .. }) if origin == "broken.json"
        ));
    }
}
