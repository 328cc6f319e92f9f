//! Schema validation helpers.
//!
//! Checks engine configuration JSON against a [`Schema`] before any adapter
//! logic runs. Values the engine has not resolved yet arrive as the unknown
//! sentinel and pass every check.
//!
//! # Example
//!
//! ```
//! use sonarr_provider::schema::{Schema, Attribute};
//! use sonarr_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("label", Attribute::required_string())
//!     .with_attribute("id", Attribute::id());
//!
//! assert!(validate(&schema, &json!({"label": "eng"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"label": 3}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("label".to_string()));
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::value::{index_path, join_path, json_type_name, UNKNOWN_VALUE};

/// Validate a JSON configuration against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes may not be set
/// - Attribute types must match the schema
/// - The unknown sentinel is accepted anywhere
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object").with_detail(format!("Got {}", json_type_name(other))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in schema.attributes() {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn is_unknown(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_VALUE)
}

fn validate_attribute(attr: &Attribute, value: Option<&Value>, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) if is_unknown(v) => {},
        Some(v) if !attr.is_configurable() => {
            diagnostics.push(
                Diagnostic::error(format!("Attribute '{}' is computed", path))
                    .with_detail(format!("Got {}; this value is set by Sonarr", json_type_name(v)))
                    .with_attribute(path),
            );
        },
        Some(v) => validate_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_type(attr_type: &AttributeType, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if is_unknown(value) {
        return;
    }
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => match value.as_array() {
            Some(arr) => {
                for (i, elem) in arr.iter().enumerate() {
                    if !elem.is_null() {
                        validate_type(element_type, elem, &index_path(path, i), diagnostics);
                    }
                }
            },
            None => diagnostics.push(type_error(path, attr_type.type_name(), value)),
        },
        AttributeType::Map(value_type) => match value.as_object() {
            Some(obj) => {
                for (key, val) in obj {
                    if !val.is_null() {
                        validate_type(value_type, val, &join_path(path, key), diagnostics);
                    }
                }
            },
            None => diagnostics.push(type_error(path, "map", value)),
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => validate_object(attrs, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
        AttributeType::Dynamic => {},
    }
}

fn validate_object(
    attrs: &BTreeMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr_type) in attrs {
        // object members carry no presence flags
        if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
            validate_type(attr_type, value, &join_path(path, name), diagnostics);
        }
    }
    for name in obj.keys().filter(|name| !attrs.contains_key(*name)) {
        diagnostics.push(
            Diagnostic::error(format!("Unsupported attribute '{}'", join_path(path, name)))
                .with_detail(format!("Expected one of {}", attrs.keys().cloned().collect::<Vec<_>>().join(", ")))
                .with_attribute(join_path(path, name)),
        );
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64()
                || n
                    .as_f64()
                    .map(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
                    .unwrap_or(false)
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, json_type_name(got)))
        .with_attribute(path)
}
