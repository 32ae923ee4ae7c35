//! JSON schema parser for Avro schemas.
//!
//! Parses a generated schema document into the AvroSchema type hierarchy and
//! checks the rules a builder document must satisfy: every named type is
//! defined once, every reference points at a type defined earlier in the
//! document (or an enclosing one), and unions are flat and unambiguous.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::warn;

use crate::builder::name::split;
use crate::builder::FieldOrder;
use crate::error::SchemaError;
use crate::schema::{
    AvroSchema, EnumSchema, FieldSchema, FixedSchema, LogicalType, LogicalTypeName, RecordSchema,
};

/// Parse an Avro schema from a JSON string.
///
/// # Example
/// ```
/// use avro_builder::schema::parse_schema;
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// assert!(schema.is_primitive());
/// ```
pub fn parse_schema(json: &str) -> Result<AvroSchema, SchemaError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SchemaError::ParseError(format!("Invalid JSON: {}", e)))?;

    SchemaParser::new().parse(&value)
}

/// Schema parser with named type resolution context.
///
/// Name violations are errors in strict mode and warnings otherwise. Union
/// and reference rules are always enforced.
#[derive(Debug, Default)]
pub struct SchemaParser {
    /// Named types seen so far, by fully qualified name
    named_types: HashMap<String, AvroSchema>,
    /// Namespace of the innermost enclosing named type
    current_namespace: Option<String>,
    strict_names: bool,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether invalid names are errors.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Parse a JSON value into an AvroSchema.
    pub fn parse(&mut self, value: &Value) -> Result<AvroSchema, SchemaError> {
        match value {
            Value::String(s) => self.parse_string_schema(s),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(arr) => self.parse_union_schema(arr),
            _ => Err(SchemaError::InvalidSchema(format!(
                "Expected string, object, or array, found: {}",
                value
            ))),
        }
    }

    /// Get a named type from the registry.
    pub fn get_named_type(&self, fullname: &str) -> Option<&AvroSchema> {
        self.named_types.get(fullname)
    }

    /// Get all registered named types.
    pub fn named_types(&self) -> &HashMap<String, AvroSchema> {
        &self.named_types
    }

    fn parse_string_schema(&self, s: &str) -> Result<AvroSchema, SchemaError> {
        match primitive(s) {
            Some(schema) => Ok(schema),
            None => self.resolve_reference(s),
        }
    }

    fn parse_object_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::InvalidSchema("Missing 'type' field".to_string()))?;

        let type_str = match type_value {
            Value::String(s) => s.as_str(),
            // {"type": {...}} and {"type": [...]} wrap another schema
            nested => return self.parse(nested),
        };

        let base = match type_str {
            "record" => self.parse_record_schema(obj, false)?,
            "error" => self.parse_record_schema(obj, true)?,
            "enum" => self.parse_enum_schema(obj)?,
            "fixed" => self.parse_fixed_schema(obj)?,
            "array" => {
                let items = obj.get("items").ok_or_else(|| {
                    SchemaError::InvalidSchema("Array missing 'items' field".to_string())
                })?;
                AvroSchema::Array(Box::new(self.parse(items)?))
            }
            "map" => {
                let values = obj.get("values").ok_or_else(|| {
                    SchemaError::InvalidSchema("Map missing 'values' field".to_string())
                })?;
                AvroSchema::Map(Box::new(self.parse(values)?))
            }
            other => self.parse_string_schema(other)?,
        };

        match obj.get("logicalType") {
            Some(logical_type) => self.parse_logical_type(obj, logical_type, base),
            None => Ok(base),
        }
    }

    fn parse_union_schema(&mut self, arr: &[Value]) -> Result<AvroSchema, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Union schema cannot be empty".to_string(),
            ));
        }

        let variants = arr
            .iter()
            .map(|v| self.parse(v))
            .collect::<Result<Vec<_>, _>>()?;

        validate_union(&variants)?;
        Ok(AvroSchema::Union(variants))
    }

    fn parse_record_schema(
        &mut self,
        obj: &Map<String, Value>,
        is_error: bool,
    ) -> Result<AvroSchema, SchemaError> {
        let (name, namespace, fullname) = self.declare_name(obj, "Record")?;

        // Placeholder so fields can refer back to the record itself
        self.named_types
            .insert(fullname.clone(), AvroSchema::Named(fullname.clone()));

        let fields_value = obj
            .get("fields")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Record '{}' missing 'fields' array", fullname))
            })?;

        let previous = std::mem::replace(&mut self.current_namespace, namespace.clone());
        let fields = fields_value
            .iter()
            .map(|f| self.parse_field_schema(f))
            .collect::<Result<Vec<_>, _>>();
        self.current_namespace = previous;
        let fields = fields?;

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Record '{}' has duplicate field '{}'",
                    fullname, field.name
                )));
            }
        }

        let schema = AvroSchema::Record(RecordSchema {
            name,
            namespace,
            fields,
            doc: string_attr(obj, "doc"),
            aliases: aliases(obj),
            is_error,
        });
        self.named_types.insert(fullname, schema.clone());
        Ok(schema)
    }

    fn parse_field_schema(&mut self, value: &Value) -> Result<FieldSchema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::InvalidSchema("Field must be an object".to_string()))?;

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Field missing 'name'".to_string()))?
            .to_string();
        self.validate_name(&name, "Field")?;

        let type_value = obj.get("type").ok_or_else(|| {
            SchemaError::InvalidSchema(format!("Field '{}' missing 'type'", name))
        })?;
        let schema = self.parse(type_value)?;

        let order = match obj.get("order").and_then(|v| v.as_str()) {
            Some(order) => FieldOrder::from_name(order).ok_or_else(|| {
                SchemaError::InvalidSchema(format!(
                    "Field '{}' has invalid order '{}'",
                    name, order
                ))
            })?,
            None => FieldOrder::Ascending,
        };

        Ok(FieldSchema {
            default: obj.get("default").cloned(),
            doc: string_attr(obj, "doc"),
            order,
            aliases: aliases(obj),
            name,
            schema,
        })
    }

    fn parse_enum_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let (name, namespace, fullname) = self.declare_name(obj, "Enum")?;

        let symbols = obj
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SchemaError::InvalidSchema("Enum missing 'symbols' array".to_string()))?
            .iter()
            .map(|v| {
                v.as_str().map(String::from).ok_or_else(|| {
                    SchemaError::InvalidSchema(format!("Enum '{}' has a non-string symbol", fullname))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if symbols.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Enum must have at least one symbol".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for symbol in &symbols {
            self.validate_name(symbol, "Enum symbol")?;
            if !seen.insert(symbol.as_str()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Enum '{}' has duplicate symbol '{}'",
                    fullname, symbol
                )));
            }
        }

        let default = string_attr(obj, "default");
        if let Some(default) = &default {
            if !symbols.contains(default) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Enum '{}' default '{}' is not one of its symbols",
                    fullname, default
                )));
            }
        }

        let schema = AvroSchema::Enum(EnumSchema {
            name,
            namespace,
            symbols,
            doc: string_attr(obj, "doc"),
            aliases: aliases(obj),
            default,
        });
        self.named_types.insert(fullname, schema.clone());
        Ok(schema)
    }

    fn parse_fixed_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let (name, namespace, fullname) = self.declare_name(obj, "Fixed")?;

        let size = obj.get("size").and_then(|v| v.as_u64()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!("Fixed '{}' missing 'size' field", fullname))
        })? as usize;

        let schema = AvroSchema::Fixed(FixedSchema {
            name,
            namespace,
            size,
            doc: string_attr(obj, "doc"),
            aliases: aliases(obj),
        });
        self.named_types.insert(fullname, schema.clone());
        Ok(schema)
    }

    /// Wrap `base` in a logical type; unknown or misplaced logical types are
    /// ignored and the base schema is returned.
    fn parse_logical_type(
        &self,
        obj: &Map<String, Value>,
        logical_type_value: &Value,
        base: AvroSchema,
    ) -> Result<AvroSchema, SchemaError> {
        let logical_type_name = logical_type_value.as_str().ok_or_else(|| {
            SchemaError::InvalidSchema("logicalType must be a string".to_string())
        })?;

        let logical_type = match logical_type_name {
            "decimal" => {
                let precision = obj
                    .get("precision")
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| {
                        SchemaError::InvalidSchema("Decimal missing 'precision'".to_string())
                    })? as u32;
                let scale = obj.get("scale").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                if scale > precision {
                    return Err(SchemaError::InvalidSchema(format!(
                        "Decimal scale {} exceeds precision {}",
                        scale, precision
                    )));
                }
                LogicalTypeName::Decimal { precision, scale }
            }
            "uuid" => LogicalTypeName::Uuid,
            "date" => LogicalTypeName::Date,
            "time-millis" => LogicalTypeName::TimeMillis,
            "time-micros" => LogicalTypeName::TimeMicros,
            "timestamp-millis" => LogicalTypeName::TimestampMillis,
            "timestamp-micros" => LogicalTypeName::TimestampMicros,
            "local-timestamp-millis" => LogicalTypeName::LocalTimestampMillis,
            "local-timestamp-micros" => LogicalTypeName::LocalTimestampMicros,
            "duration" => LogicalTypeName::Duration,
            _ => return Ok(base),
        };

        if base.is_primitive() || matches!(base, AvroSchema::Fixed(_)) {
            Ok(AvroSchema::Logical(LogicalType::new(base, logical_type)))
        } else {
            Ok(base)
        }
    }

    /// Read, validate, and reserve the name of a named type.
    fn declare_name(
        &self,
        obj: &Map<String, Value>,
        context: &str,
    ) -> Result<(String, Option<String>, String), SchemaError> {
        let raw = obj.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!("{} missing 'name' field", context))
        })?;

        let namespace = match obj.get("namespace") {
            Some(Value::String(ns)) if !ns.is_empty() => Some(ns.as_str()),
            Some(Value::String(_)) | Some(Value::Null) => None,
            Some(_) => {
                return Err(SchemaError::InvalidSchema(format!(
                    "{} '{}' has a non-string namespace",
                    context, raw
                )))
            }
            None => self.current_namespace.as_deref(),
        };

        let (name, namespace) = split(raw, namespace);
        self.validate_name(&name, context)?;
        if let Some(ns) = &namespace {
            for part in ns.split('.') {
                self.validate_name(part, "Namespace component")?;
            }
        }

        let fullname = match &namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.clone(),
        };
        if self.named_types.contains_key(&fullname) {
            return Err(SchemaError::InvalidSchema(format!(
                "Named type '{}' is defined more than once",
                fullname
            )));
        }
        Ok((name, namespace, fullname))
    }

    /// Resolve a reference against the types defined so far.
    fn resolve_reference(&self, name: &str) -> Result<AvroSchema, SchemaError> {
        let qualified = match &self.current_namespace {
            Some(ns) if !name.contains('.') => format!("{}.{}", ns, name),
            _ => name.to_string(),
        };
        if self.named_types.contains_key(&qualified) {
            Ok(AvroSchema::Named(qualified))
        } else if self.named_types.contains_key(name) {
            Ok(AvroSchema::Named(name.to_string()))
        } else {
            Err(SchemaError::UnsupportedType(format!("Unknown type: {}", name)))
        }
    }

    /// Avro names must start with [A-Za-z_] and contain only [A-Za-z0-9_].
    fn validate_name(&self, name: &str, context: &str) -> Result<(), SchemaError> {
        let mut chars = name.chars();
        let message = match chars.next() {
            None => return Err(SchemaError::InvalidSchema(format!("{} name cannot be empty", context))),
            Some(first) if !first.is_ascii_alphabetic() && first != '_' => format!(
                "{} name '{}' must start with a letter or underscore",
                context, name
            ),
            Some(_) => match chars.find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
                Some(ch) => format!(
                    "{} name '{}' contains invalid character '{}'",
                    context, name, ch
                ),
                None => return Ok(()),
            },
        };

        if self.strict_names {
            Err(SchemaError::InvalidSchema(message))
        } else {
            warn!("{}", message);
            Ok(())
        }
    }
}

fn primitive(name: &str) -> Option<AvroSchema> {
    match name {
        "null" => Some(AvroSchema::Null),
        "boolean" => Some(AvroSchema::Boolean),
        "int" => Some(AvroSchema::Int),
        "long" => Some(AvroSchema::Long),
        "float" => Some(AvroSchema::Float),
        "double" => Some(AvroSchema::Double),
        "bytes" => Some(AvroSchema::Bytes),
        "string" => Some(AvroSchema::String),
        _ => None,
    }
}

fn string_attr(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn aliases(obj: &Map<String, Value>) -> Vec<String> {
    obj.get("aliases")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Unions may not nest and may not repeat a type.
fn validate_union(variants: &[AvroSchema]) -> Result<(), SchemaError> {
    let mut seen_types = HashSet::new();
    for (i, variant) in variants.iter().enumerate() {
        if matches!(variant, AvroSchema::Union(_)) {
            return Err(SchemaError::InvalidSchema(format!(
                "Union contains nested union at position {}",
                i
            )));
        }
        let type_key = type_key(variant);
        if !seen_types.insert(type_key.clone()) {
            return Err(SchemaError::InvalidSchema(format!(
                "Union contains duplicate type '{}' at position {}",
                type_key, i
            )));
        }
    }
    Ok(())
}

/// A key identifying a union branch for duplicate detection.
fn type_key(schema: &AvroSchema) -> String {
    match schema {
        AvroSchema::Array(_) => "array".to_string(),
        AvroSchema::Map(_) => "map".to_string(),
        AvroSchema::Union(_) => "union".to_string(),
        AvroSchema::Logical(lt) => type_key(&lt.base),
        named => match named.fullname() {
            Some(fullname) => fullname,
            None => named.to_json(),
        },
    }
}
