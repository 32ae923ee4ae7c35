//! Property-based tests for schema building.
//!
//! These tests use proptest to check the serialization guarantees across many
//! generated declarations: named types are defined once, field overwrite is
//! last-write-wins in the original slot, optional fields wrap in a union with
//! null, and `extends` copies fields by value.

use proptest::prelude::*;
use serde_json::{json, Value};

use avro_builder::{
    build, build_dsl, BuilderConfig, BuilderError, DefineTypes, Dsl, FieldOptions, TypeRef,
};

// ============================================================================
// Generators
// ============================================================================

/// Generate non-null primitive type names.
fn arb_primitive() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("boolean"),
        Just("int"),
        Just("long"),
        Just("float"),
        Just("double"),
        Just("bytes"),
        Just("string"),
    ]
}

/// Generate valid Avro names (must start with [A-Za-z_] and contain only [A-Za-z0-9_]).
fn arb_avro_name() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,10}"
}

/// How a field refers to the shared named type.
#[derive(Debug, Clone, Copy)]
enum Usage {
    Direct,
    Optional,
    Array,
    Map,
}

fn arb_usage() -> impl Strategy<Value = Usage> {
    prop_oneof![
        Just(Usage::Direct),
        Just(Usage::Optional),
        Just(Usage::Array),
        Just(Usage::Map),
    ]
}

fn to_value(json: &str) -> Value {
    serde_json::from_str(json).unwrap()
}

/// Collect every occurrence of `fullname` in `document`, as a full definition
/// (`true`) or a bare reference (`false`).
fn occurrences(document: &Value, name: &str, fullname: &str, found: &mut Vec<bool>) {
    match document {
        Value::String(s) if s == fullname => found.push(false),
        Value::Array(items) => {
            for item in items {
                occurrences(item, name, fullname, found);
            }
        }
        Value::Object(obj) => {
            let is_definition = obj.get("name") == Some(&json!(name))
                && matches!(obj.get("type"), Some(Value::String(t)) if t == "record");
            if is_definition {
                found.push(true);
            }
            for (key, value) in obj {
                if key != "name" && key != "namespace" {
                    occurrences(value, name, fullname, found);
                }
            }
        }
        _ => {}
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A named type used N times is defined once and referenced N-1 times.
    #[test]
    fn prop_named_type_defined_once(usages in prop::collection::vec(arb_usage(), 2..8)) {
        let count = usages.len();
        let json = build(BuilderConfig::default(), |dsl| {
            dsl.namespace("shared")?;
            dsl.record("Target", |r| r.required("id", "long", FieldOptions::new()))?;
            dsl.record("Holder", |r| {
                for (i, usage) in usages.iter().enumerate() {
                    let name = format!("f{}", i);
                    match usage {
                        Usage::Direct => r.required(&name, "Target", FieldOptions::new())?,
                        Usage::Optional => r.optional(&name, "Target", FieldOptions::new())?,
                        Usage::Array => r.required(&name, TypeRef::array("Target"), FieldOptions::new())?,
                        Usage::Map => r.required(&name, TypeRef::map("Target"), FieldOptions::new())?,
                    }
                }
                Ok(())
            })?;
            Ok(())
        }).unwrap();

        let mut found = Vec::new();
        occurrences(&to_value(&json), "Target", "shared.Target", &mut found);

        prop_assert_eq!(found.len(), count);
        prop_assert!(found[0], "first occurrence must be the definition");
        prop_assert_eq!(found.iter().filter(|&&full| full).count(), 1);
    }

    /// Re-declaring a field keeps one entry, in its first slot, with the last
    /// declaration's type.
    #[test]
    fn prop_overwrite_last_write_wins(
        declarations in prop::collection::vec((0usize..4, arb_primitive()), 1..12)
    ) {
        let names = ["a", "b", "c", "d"];
        let json = build(BuilderConfig::default(), |dsl| {
            dsl.record("ns.Row", |r| {
                for (index, ty) in &declarations {
                    r.required(names[*index], *ty, FieldOptions::new())?;
                }
                Ok(())
            })?;
            Ok(())
        }).unwrap();

        let mut expected: Vec<(&str, &str)> = Vec::new();
        for (index, ty) in &declarations {
            let name = names[*index];
            match expected.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = *ty,
                None => expected.push((name, *ty)),
            }
        }

        let document = to_value(&json);
        let fields = document["fields"].as_array().unwrap();
        prop_assert_eq!(fields.len(), expected.len());
        for (field, (name, ty)) in fields.iter().zip(&expected) {
            prop_assert_eq!(&field["name"], &json!(name));
            prop_assert_eq!(&field["type"], &json!(ty));
        }
    }

    /// Optional fields are a union of null and the type, defaulting to null.
    #[test]
    fn prop_optional_wraps_in_null_union(ty in arb_primitive(), name in arb_avro_name()) {
        let json = build(BuilderConfig::default(), |dsl| {
            dsl.record("ns.Opt", |r| r.optional(&name, ty, FieldOptions::new()))?;
            Ok(())
        }).unwrap();

        let document = to_value(&json);
        prop_assert_eq!(
            &document["fields"][0],
            &json!({"name": name, "type": ["null", ty], "default": null})
        );
    }

    /// Changing a field copied by `extends` never changes the source record.
    #[test]
    fn prop_extends_is_a_value_copy(
        types in prop::collection::vec(arb_primitive(), 1..6),
        changed in 0usize..6,
    ) {
        let changed = changed % types.len();
        let mut builder = build_dsl(BuilderConfig::default(), |dsl| {
            define_base(dsl, &types)?;
            dsl.record("ns.Copy", |r| {
                r.extends("Base")?;
                if let Some(field) = r.field_mut(&format!("f{}", changed)) {
                    field.set_optional(true);
                }
                Ok(())
            })?;
            Ok(())
        }).unwrap();

        let base = builder.serialize("ns.Base", None).unwrap();
        let copy = builder.serialize("ns.Copy", None).unwrap();

        for (i, ty) in types.iter().enumerate() {
            prop_assert_eq!(&base["fields"][i]["type"], &json!(ty));
            if i == changed {
                prop_assert_eq!(&copy["fields"][i]["type"], &json!(["null", ty]));
            } else {
                prop_assert_eq!(&copy["fields"][i]["type"], &json!(ty));
            }
        }
    }
}

fn define_base(dsl: &mut Dsl<'_>, types: &[&'static str]) -> Result<(), BuilderError> {
    dsl.record("ns.Base", |r| {
        for (i, ty) in types.iter().enumerate() {
            r.required(&format!("f{}", i), *ty, FieldOptions::new())?;
        }
        Ok(())
    })?;
    Ok(())
}
