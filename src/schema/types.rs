//! Parsed Avro schema representation.
//!
//! This is the structured form returned by `build_schema`: a validated tree
//! of primitives, complex types, named references, and logical types.

use serde_json::{json, Map, Value};

use crate::builder::FieldOrder;

/// Represents a parsed Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    // Primitive types
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,

    // Complex types
    /// Record (or error) type with named fields.
    Record(RecordSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Array of items with a single schema.
    Array(Box<AvroSchema>),
    /// Map with string keys and values of a single schema.
    Map(Box<AvroSchema>),
    /// Union of multiple schemas.
    Union(Vec<AvroSchema>),
    /// Fixed-size byte array.
    Fixed(FixedSchema),

    /// Reference to a named type defined earlier in the document.
    Named(String),

    /// Logical type wrapper.
    Logical(LogicalType),
}

fn fullname(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("{}.{}", ns, name),
        None => name.to_string(),
    }
}

fn named_object(kind: &str, name: &str, namespace: Option<&str>) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!(kind));
    obj.insert("name".to_string(), json!(name));
    if let Some(ns) = namespace {
        obj.insert("namespace".to_string(), json!(ns));
    }
    obj
}

fn insert_doc_and_aliases(obj: &mut Map<String, Value>, doc: &Option<String>, aliases: &[String]) {
    if let Some(doc) = doc {
        obj.insert("doc".to_string(), json!(doc));
    }
    if !aliases.is_empty() {
        obj.insert("aliases".to_string(), json!(aliases));
    }
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub fields: Vec<FieldSchema>,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    /// Declared with `"type": "error"`.
    pub is_error: bool,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            fields,
            doc: None,
            aliases: Vec::new(),
            is_error: false,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn fullname(&self) -> String {
        fullname(&self.name, self.namespace.as_deref())
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn to_json_value(&self) -> Value {
        let kind = if self.is_error { "error" } else { "record" };
        let mut obj = named_object(kind, &self.name, self.namespace.as_deref());
        let fields: Vec<Value> = self.fields.iter().map(|f| f.to_json_value()).collect();
        obj.insert("fields".to_string(), Value::Array(fields));
        insert_doc_and_aliases(&mut obj, &self.doc, &self.aliases);
        Value::Object(obj)
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub schema: AvroSchema,
    pub default: Option<Value>,
    pub doc: Option<String>,
    pub order: FieldOrder,
    pub aliases: Vec<String>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, schema: AvroSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            doc: None,
            order: FieldOrder::Ascending,
            aliases: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(&self.name));
        obj.insert("type".to_string(), self.schema.to_json_value());
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }
        if self.order != FieldOrder::Ascending {
            obj.insert("order".to_string(), json!(self.order.as_str()));
        }
        insert_doc_and_aliases(&mut obj, &self.doc, &self.aliases);
        Value::Object(obj)
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub symbols: Vec<String>,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub default: Option<String>,
}

impl EnumSchema {
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            symbols,
            doc: None,
            aliases: Vec::new(),
            default: None,
        }
    }

    pub fn fullname(&self) -> String {
        fullname(&self.name, self.namespace.as_deref())
    }

    pub fn to_json_value(&self) -> Value {
        let mut obj = named_object("enum", &self.name, self.namespace.as_deref());
        obj.insert("symbols".to_string(), json!(&self.symbols));
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), json!(default));
        }
        insert_doc_and_aliases(&mut obj, &self.doc, &self.aliases);
        Value::Object(obj)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub size: usize,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
}

impl FixedSchema {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            size,
            doc: None,
            aliases: Vec::new(),
        }
    }

    pub fn fullname(&self) -> String {
        fullname(&self.name, self.namespace.as_deref())
    }

    pub fn to_json_value(&self) -> Value {
        let mut obj = named_object("fixed", &self.name, self.namespace.as_deref());
        obj.insert("size".to_string(), json!(self.size));
        insert_doc_and_aliases(&mut obj, &self.doc, &self.aliases);
        Value::Object(obj)
    }
}

/// Logical type wrapper around a base schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalType {
    pub base: Box<AvroSchema>,
    pub logical_type: LogicalTypeName,
}

impl LogicalType {
    pub fn new(base: AvroSchema, logical_type: LogicalTypeName) -> Self {
        Self {
            base: Box::new(base),
            logical_type,
        }
    }

    /// The base type's object form plus `logicalType` and its parameters.
    pub fn to_json_value(&self) -> Value {
        let mut obj = match self.base.to_json_value() {
            Value::Object(obj) => obj,
            base => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), base);
                obj
            }
        };
        obj.insert("logicalType".to_string(), json!(self.logical_type.name()));
        if let LogicalTypeName::Decimal { precision, scale } = &self.logical_type {
            obj.insert("precision".to_string(), json!(precision));
            if *scale > 0 {
                obj.insert("scale".to_string(), json!(scale));
            }
        }
        Value::Object(obj)
    }
}

/// Logical type names with their parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalTypeName {
    Decimal { precision: u32, scale: u32 },
    Uuid,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    LocalTimestampMillis,
    LocalTimestampMicros,
    Duration,
}

impl LogicalTypeName {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalTypeName::Decimal { .. } => "decimal",
            LogicalTypeName::Uuid => "uuid",
            LogicalTypeName::Date => "date",
            LogicalTypeName::TimeMillis => "time-millis",
            LogicalTypeName::TimeMicros => "time-micros",
            LogicalTypeName::TimestampMillis => "timestamp-millis",
            LogicalTypeName::TimestampMicros => "timestamp-micros",
            LogicalTypeName::LocalTimestampMillis => "local-timestamp-millis",
            LogicalTypeName::LocalTimestampMicros => "local-timestamp-micros",
            LogicalTypeName::Duration => "duration",
        }
    }
}

impl AvroSchema {
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            AvroSchema::Null
                | AvroSchema::Boolean
                | AvroSchema::Int
                | AvroSchema::Long
                | AvroSchema::Float
                | AvroSchema::Double
                | AvroSchema::Bytes
                | AvroSchema::String
        )
    }

    /// Fully qualified name of a named type or reference.
    pub fn fullname(&self) -> Option<String> {
        match self {
            AvroSchema::Record(r) => Some(r.fullname()),
            AvroSchema::Enum(e) => Some(e.fullname()),
            AvroSchema::Fixed(f) => Some(f.fullname()),
            AvroSchema::Named(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// Whether this is a union containing null.
    pub fn is_nullable(&self) -> bool {
        match self {
            AvroSchema::Union(variants) => variants.iter().any(|v| matches!(v, AvroSchema::Null)),
            _ => false,
        }
    }

    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    pub fn to_json_value(&self) -> Value {
        match self {
            AvroSchema::Null => json!("null"),
            AvroSchema::Boolean => json!("boolean"),
            AvroSchema::Int => json!("int"),
            AvroSchema::Long => json!("long"),
            AvroSchema::Float => json!("float"),
            AvroSchema::Double => json!("double"),
            AvroSchema::Bytes => json!("bytes"),
            AvroSchema::String => json!("string"),
            AvroSchema::Record(r) => r.to_json_value(),
            AvroSchema::Enum(e) => e.to_json_value(),
            AvroSchema::Array(items) => json!({"type": "array", "items": items.to_json_value()}),
            AvroSchema::Map(values) => json!({"type": "map", "values": values.to_json_value()}),
            AvroSchema::Union(variants) => {
                Value::Array(variants.iter().map(|v| v.to_json_value()).collect())
            }
            AvroSchema::Fixed(f) => f.to_json_value(),
            AvroSchema::Named(name) => json!(name),
            AvroSchema::Logical(lt) => lt.to_json_value(),
        }
    }
}
