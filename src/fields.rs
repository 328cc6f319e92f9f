//! Field codec for polymorphic upstream entities.
//!
//! Indexers, download clients, notifications, metadata consumers, import
//! lists and the specifications nested in custom formats and auto tags all
//! carry their implementation-specific settings as
//! `fields: [{"name": ..., "value": ...}]`. The provider flattens those into
//! first-class attributes; a [`Family`] table says which attributes exist,
//! and each [`Implementation`] says which of them it accepts, which it
//! requires and under which upstream name they travel.

use std::collections::BTreeMap;

use heck::ToLowerCamelCase;
use serde_json::{json, Map, Value as Json};

use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic};
use crate::value::{from_plain, index_path, join_path, to_plain, State, Value};

/// Placeholders the upstream returns instead of a stored secret.
pub const MASKED_PLACEHOLDERS: &[&str] = &["", "********"];

/// Engine-side type of a flattened field attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A string.
    String,
    /// An integer.
    Int,
    /// A float.
    Float,
    /// A boolean.
    Bool,
    /// Unordered integers.
    IntSet,
    /// Unordered strings.
    StringSet,
}

impl FieldType {
    /// The engine attribute type.
    pub fn attribute_type(self) -> AttributeType {
        match self {
            FieldType::String => AttributeType::String,
            FieldType::Int => AttributeType::Int64,
            FieldType::Float => AttributeType::Float64,
            FieldType::Bool => AttributeType::Bool,
            FieldType::IntSet => AttributeType::set(AttributeType::Int64),
            FieldType::StringSet => AttributeType::set(AttributeType::String),
        }
    }
}

/// How a field's value is shaped on the wire when it differs from the engine value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    /// Same shape on both sides.
    Plain,
    /// Engine string, upstream integer.
    IntAsString,
    /// Engine space-separated string, upstream list of strings.
    WordList,
}

/// A flattened field attribute declared by a family.
#[derive(Debug, Clone, Copy)]
pub struct FieldAttr {
    /// Engine attribute name.
    pub attr: &'static str,
    /// Engine type.
    pub ty: FieldType,
    /// Whether the value is a secret the upstream masks on read.
    pub sensitive: bool,
}

impl FieldAttr {
    /// Declare a field attribute.
    pub const fn new(attr: &'static str, ty: FieldType) -> Self {
        Self {
            attr,
            ty,
            sensitive: false,
        }
    }

    /// Mark the attribute as a secret.
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Schema attribute for a top-level flattened field.
    pub fn schema_attribute(&self) -> Attribute {
        let flags = if self.sensitive {
            AttributeFlags::optional_computed().sensitive()
        } else {
            AttributeFlags::optional_computed()
        };
        Attribute::new(self.ty.attribute_type(), flags).with_use_state_for_unknown()
    }
}

/// How one implementation carries one field attribute.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Engine attribute name.
    pub attr: &'static str,
    /// Upstream field name.
    pub name: &'static str,
    /// Wire coercion.
    pub wire: Wire,
    /// Whether the implementation rejects a missing value.
    pub required: bool,
}

impl FieldDef {
    /// Map an attribute to an upstream field name.
    pub const fn new(attr: &'static str, name: &'static str) -> Self {
        Self {
            attr,
            name,
            wire: Wire::Plain,
            required: false,
        }
    }

    /// Mark the field as required for the implementation.
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the wire coercion.
    pub const fn wire(mut self, wire: Wire) -> Self {
        self.wire = wire;
        self
    }
}

/// One upstream implementation of a polymorphic family.
#[derive(Debug, Clone, Copy)]
pub struct Implementation {
    /// Discriminator as the upstream spells it.
    pub name: &'static str,
    /// Companion settings contract.
    pub config_contract: &'static str,
    /// Fields this implementation accepts.
    pub fields: &'static [FieldDef],
}

impl Implementation {
    /// The definition for an attribute, if the implementation accepts it.
    pub fn field(&self, attr: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|def| def.attr == attr)
    }
}

/// A polymorphic entity family.
#[derive(Debug, Clone, Copy)]
pub struct Family {
    /// Human readable kind, used in messages.
    pub kind: &'static str,
    /// Every flattened field attribute of the family.
    pub attributes: &'static [FieldAttr],
    /// Known implementations.
    pub implementations: &'static [Implementation],
}

impl Family {
    /// Look up an implementation by its exact discriminator.
    pub fn implementation(&self, name: &str) -> Option<&Implementation> {
        self.implementations.iter().find(|imp| imp.name == name)
    }

    /// Look up a field attribute.
    pub fn attribute(&self, attr: &str) -> Option<&FieldAttr> {
        self.attributes.iter().find(|a| a.attr == attr)
    }

    /// Names of every implementation, for messages.
    pub fn implementation_names(&self) -> Vec<&'static str> {
        self.implementations.iter().map(|imp| imp.name).collect()
    }

    /// Member types of every field attribute.
    pub fn member_types(&self) -> BTreeMap<String, AttributeType> {
        self.attributes
            .iter()
            .map(|a| (a.attr.to_string(), a.ty.attribute_type()))
            .collect()
    }

    fn definition(&self, implementation: Option<&str>, attr: &FieldAttr) -> FieldDef {
        implementation
            .and_then(|name| self.implementation(name))
            .and_then(|imp| imp.field(attr.attr).copied())
            .unwrap_or_else(|| FieldDef {
                attr: attr.attr,
                name: "",
                wire: Wire::Plain,
                required: false,
            })
    }
}

/// Read access to flattened field values, from a state or an object member map.
pub trait FieldValues {
    /// Value of an attribute; null when absent.
    fn field(&self, attr: &str) -> &Value;
}

impl FieldValues for State {
    fn field(&self, attr: &str) -> &Value {
        self.get(attr)
    }
}

impl FieldValues for Value {
    fn field(&self, attr: &str) -> &Value {
        self.member(attr)
    }
}

/// Decode an upstream `fields` array into one value per family attribute.
///
/// Attributes the array does not mention, or that the implementation does
/// not accept, decode to null.
pub fn decode_fields(
    family: &Family,
    implementation: Option<&str>,
    fields: Option<&Json>,
    path: &str,
) -> Result<BTreeMap<String, Value>, ProviderError> {
    let mut by_name: BTreeMap<&str, &Json> = BTreeMap::new();
    if let Some(Json::Array(entries)) = fields {
        for entry in entries {
            if let Some(name) = entry.get("name").and_then(Json::as_str) {
                if let Some(value) = entry.get("value") {
                    by_name.insert(name, value);
                }
            }
        }
    }

    let known = implementation.and_then(|name| family.implementation(name));
    let mut out = BTreeMap::new();
    for attr in family.attributes {
        // A known implementation only owns the attributes its table lists.
        if known.is_some_and(|imp| imp.field(attr.attr).is_none()) {
            out.insert(attr.attr.to_string(), Value::Null);
            continue;
        }
        let def = family.definition(implementation, attr);
        let camel = attr.attr.to_lower_camel_case();
        let name = if def.name.is_empty() { camel.as_str() } else { def.name };
        let attr_path = join_path(path, attr.attr);
        let raw = by_name.get(name).copied().map(|raw| wire_decode(def.wire, raw));
        let value = from_plain(raw.as_ref(), &attr.ty.attribute_type(), &attr_path)?;
        out.insert(attr.attr.to_string(), value);
    }
    Ok(out)
}

/// Encode the non-null field attributes accepted by `implementation`.
///
/// Null attributes are never emitted: the upstream treats an omitted field
/// as unset but an explicit null as a request to clear it. A non-null value
/// for an attribute the implementation does not accept is rejected.
pub fn encode_fields(
    family: &Family,
    implementation: &str,
    values: &dyn FieldValues,
    path: &str,
) -> Result<Json, ProviderError> {
    let imp = family.implementation(implementation).ok_or_else(|| {
        ProviderError::validation(
            join_path(path, "implementation"),
            format!(
                "unsupported {} implementation '{}'; expected one of {}",
                family.kind,
                implementation,
                family.implementation_names().join(", ")
            ),
        )
    })?;

    for attr in family.attributes {
        if imp.field(attr.attr).is_none() && !values.field(attr.attr).is_null() {
            return Err(ProviderError::validation(
                join_path(path, attr.attr),
                format!("not applicable to implementation '{}'", imp.name),
            ));
        }
    }

    let mut out = Vec::new();
    for def in imp.fields {
        let attr_path = join_path(path, def.attr);
        if let Some(plain) = to_plain(values.field(def.attr), &attr_path)? {
            out.push(json!({
                "name": def.name,
                "value": wire_encode(def.wire, plain, &attr_path)?,
            }));
        }
    }
    Ok(Json::Array(out))
}

/// Plan-time checks: implementation known, no stray attributes, required ones set.
///
/// Unknown values are given the benefit of the doubt.
pub fn validate_fields(
    family: &Family,
    implementation: &Value,
    values: &dyn FieldValues,
    path: &str,
) -> Vec<Diagnostic> {
    let name = match implementation {
        Value::String(name) => name,
        _ => return Vec::new(),
    };
    let imp = match family.implementation(name) {
        Some(imp) => imp,
        None => {
            return vec![Diagnostic::error(format!("Unsupported {} implementation", family.kind))
                .with_detail(format!(
                    "'{}' is not one of {}",
                    name,
                    family.implementation_names().join(", ")
                ))
                .with_attribute(join_path(path, "implementation"))]
        },
    };

    let mut diagnostics = Vec::new();
    for attr in family.attributes {
        let value = values.field(attr.attr);
        let attr_path = join_path(path, attr.attr);
        match imp.field(attr.attr) {
            None if !value.is_null() && !value.is_unknown() => diagnostics.push(
                Diagnostic::error(format!("Attribute '{}' not applicable", attr.attr))
                    .with_detail(format!(
                        "implementation '{}' does not accept '{}'",
                        imp.name, attr.attr
                    ))
                    .with_attribute(attr_path),
            ),
            Some(def) if def.required && value.is_null() => diagnostics.push(
                Diagnostic::error(format!("Missing required attribute '{}'", attr.attr))
                    .with_detail(format!("implementation '{}' requires it", imp.name))
                    .with_attribute(attr_path),
            ),
            Some(def) if def.wire == Wire::IntAsString => {
                if let Some(s) = value.as_str() {
                    if s.trim().parse::<i64>().is_err() {
                        diagnostics.push(
                            Diagnostic::error(format!("Invalid value for '{}'", attr.attr))
                                .with_detail(format!(
                                    "implementation '{}' expects an integer, got '{}'",
                                    imp.name, s
                                ))
                                .with_attribute(attr_path),
                        );
                    }
                }
            },
            _ => {},
        }
    }
    diagnostics
}

fn wire_decode(wire: Wire, raw: &Json) -> Json {
    match (wire, raw) {
        (Wire::IntAsString, Json::Number(n)) => Json::String(n.to_string()),
        (Wire::WordList, Json::Array(items)) => Json::String(
            items
                .iter()
                .filter_map(|item| match item {
                    Json::String(s) => Some(s.clone()),
                    Json::Null => None,
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => raw.clone(),
    }
}

fn wire_encode(wire: Wire, plain: Json, path: &str) -> Result<Json, ProviderError> {
    match (wire, plain) {
        (Wire::IntAsString, Json::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Json::from)
            .map_err(|_| ProviderError::validation(path, format!("expected an integer, got '{}'", s))),
        (Wire::WordList, Json::String(s)) => Ok(Json::Array(
            s.split_whitespace().map(|w| Json::String(w.to_string())).collect(),
        )),
        (_, plain) => Ok(plain),
    }
}

/// Whether a decoded secret is a masked placeholder (or missing).
pub fn is_masked(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => MASKED_PLACEHOLDERS.contains(&s.as_str()),
        _ => false,
    }
}

/// Replace a masked secret with the last known value.
pub fn merge_masked(response: &mut Value, prior: &Value) {
    if is_masked(response) && !is_masked(prior) && prior.is_wholly_known() {
        *response = prior.clone();
    }
}

// Specifications

const SPEC_CORE: &[(&str, AttributeType)] = &[
    ("implementation", AttributeType::String),
    ("name", AttributeType::String),
    ("negate", AttributeType::Bool),
    ("required", AttributeType::Bool),
];

/// Element type of a specification list.
pub fn specification_type(family: &Family) -> AttributeType {
    let mut members = family.member_types();
    for (name, ty) in SPEC_CORE {
        members.insert(name.to_string(), ty.clone());
    }
    AttributeType::list(AttributeType::Object(members))
}

/// Decode an upstream specification array, preserving response order.
pub fn decode_specifications(
    family: &Family,
    raw: Option<&Json>,
    path: &str,
) -> Result<Value, ProviderError> {
    let items = match raw {
        Some(Json::Array(items)) => items,
        Some(Json::Null) | None => return Ok(Value::List(Vec::new())),
        Some(other) => {
            return Err(ProviderError::DecodeTypeMismatch {
                path: path.to_string(),
                expected: "list".to_string(),
                got: crate::value::json_type_name(other).to_string(),
            })
        },
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = index_path(path, i);
        let mut members = BTreeMap::new();
        for (name, ty) in SPEC_CORE {
            members.insert(
                name.to_string(),
                from_plain(item.get(*name), ty, &join_path(&item_path, name))?,
            );
        }
        let implementation = item.get("implementation").and_then(Json::as_str);
        members.extend(decode_fields(family, implementation, item.get("fields"), &item_path)?);
        out.push(Value::Object(members));
    }
    Ok(Value::List(out))
}

/// Encode a specification list in plan order.
pub fn encode_specifications(family: &Family, value: &Value, path: &str) -> Result<Json, ProviderError> {
    let items = match value {
        Value::Unknown => return Err(ProviderError::EncodeUnknown(path.to_string())),
        Value::Null => return Ok(Json::Array(Vec::new())),
        other => other.as_elements().unwrap_or_default(),
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = index_path(path, i);
        let implementation = item.member("implementation").as_str().ok_or_else(|| {
            ProviderError::validation(join_path(&item_path, "implementation"), "must be set")
        })?;
        let mut spec = Map::new();
        for (name, _) in SPEC_CORE {
            if let Some(plain) = to_plain(item.member(name), &join_path(&item_path, name))? {
                spec.insert(name.to_string(), plain);
            }
        }
        spec.insert(
            "fields".to_string(),
            encode_fields(family, implementation, item, &item_path)?,
        );
        out.push(Json::Object(spec));
    }
    Ok(Json::Array(out))
}

/// Plan-time checks for every element of a specification list.
pub fn validate_specifications(family: &Family, value: &Value, path: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if let Some(items) = value.as_elements() {
        for (i, item) in items.iter().enumerate() {
            let item_path = index_path(path, i);
            if item.member("name").is_null() {
                diagnostics.push(
                    Diagnostic::error("Missing required attribute 'name'")
                        .with_attribute(join_path(&item_path, "name")),
                );
            }
            diagnostics.extend(validate_fields(
                family,
                item.member("implementation"),
                item,
                &item_path,
            ));
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ATTRS: &[FieldAttr] = &[
        FieldAttr::new("base_url", FieldType::String),
        FieldAttr::new("api_key", FieldType::String).sensitive(),
        FieldAttr::new("categories", FieldType::IntSet),
        FieldAttr::new("seed_ratio", FieldType::Float),
        FieldAttr::new("value", FieldType::String),
    ];

    const TEST_FAMILY: Family = Family {
        kind: "indexer",
        attributes: TEST_ATTRS,
        implementations: &[
            Implementation {
                name: "Newznab",
                config_contract: "NewznabSettings",
                fields: &[
                    FieldDef::new("base_url", "baseUrl").required(),
                    FieldDef::new("api_key", "apiKey"),
                    FieldDef::new("categories", "categories"),
                ],
            },
            Implementation {
                name: "Torznab",
                config_contract: "TorznabSettings",
                fields: &[
                    FieldDef::new("base_url", "baseUrl").required(),
                    FieldDef::new("seed_ratio", "seedCriteria.seedRatio"),
                ],
            },
            Implementation {
                name: "SeriesTypeSpecification",
                config_contract: "",
                fields: &[FieldDef::new("value", "value").wire(Wire::IntAsString)],
            },
            Implementation {
                name: "GenreSpecification",
                config_contract: "",
                fields: &[FieldDef::new("value", "value").wire(Wire::WordList)],
            },
        ],
    };

    #[test]
    fn test_decode_uses_implementation_names() {
        let fields = json!([
            {"name": "baseUrl", "value": "https://t.example"},
            {"name": "seedCriteria.seedRatio", "value": 1.5},
            {"name": "unrelated", "value": true}
        ]);
        let values = decode_fields(&TEST_FAMILY, Some("Torznab"), Some(&fields), "").unwrap();
        assert_eq!(values["base_url"], Value::from("https://t.example"));
        assert_eq!(values["seed_ratio"], Value::Float(1.5));
        assert!(values["api_key"].is_null());
        assert!(values["categories"].is_null());
    }

    #[test]
    fn test_encode_skips_nulls() {
        let state = State::new()
            .with("base_url", "https://n.example")
            .with("categories", Value::Set(vec![Value::Int(5030), Value::Int(5040)]));
        let fields = encode_fields(&TEST_FAMILY, "Newznab", &state, "").unwrap();
        assert_eq!(
            fields,
            json!([
                {"name": "baseUrl", "value": "https://n.example"},
                {"name": "categories", "value": [5030, 5040]}
            ])
        );
    }

    #[test]
    fn test_encode_rejects_inapplicable_attribute() {
        let state = State::new()
            .with("base_url", "https://n.example")
            .with("seed_ratio", 2.0);
        let err = encode_fields(&TEST_FAMILY, "Newznab", &state, "").unwrap_err();
        assert!(matches!(err, ProviderError::Validation { attribute, .. } if attribute == "seed_ratio"));
    }

    #[test]
    fn test_encode_rejects_unknown_implementation() {
        let err = encode_fields(&TEST_FAMILY, "newznab", &State::new(), "").unwrap_err();
        assert!(matches!(err, ProviderError::Validation { attribute, .. } if attribute == "implementation"));
    }

    #[test]
    fn test_validate_fields() {
        let state = State::new().with("seed_ratio", 1.0);
        let diags = validate_fields(&TEST_FAMILY, &Value::from("Newznab"), &state, "");
        let attrs: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert!(attrs.contains(&"seed_ratio".to_string()));
        assert!(attrs.contains(&"base_url".to_string()));

        let unknown_impl = validate_fields(&TEST_FAMILY, &Value::Unknown, &state, "");
        assert!(unknown_impl.is_empty());
    }

    #[test]
    fn test_wire_coercions_round_trip() {
        let spec = Value::Object(
            [
                ("value".to_string(), Value::from("2")),
                ("implementation".to_string(), Value::from("SeriesTypeSpecification")),
            ]
            .into_iter()
            .collect(),
        );
        let fields = encode_fields(&TEST_FAMILY, "SeriesTypeSpecification", &spec, "").unwrap();
        assert_eq!(fields, json!([{"name": "value", "value": 2}]));
        let back = decode_fields(&TEST_FAMILY, Some("SeriesTypeSpecification"), Some(&fields), "").unwrap();
        assert_eq!(back["value"], Value::from("2"));

        let genre = State::new().with("value", "horror comedy");
        let fields = encode_fields(&TEST_FAMILY, "GenreSpecification", &genre, "").unwrap();
        assert_eq!(fields, json!([{"name": "value", "value": ["horror", "comedy"]}]));
        let back = decode_fields(&TEST_FAMILY, Some("GenreSpecification"), Some(&fields), "").unwrap();
        assert_eq!(back["value"], Value::from("horror comedy"));
    }

    #[test]
    fn test_masked_secret_merge() {
        let mut response = Value::from("********");
        merge_masked(&mut response, &Value::from("s3cret"));
        assert_eq!(response, Value::from("s3cret"));

        let mut response = Value::from("");
        merge_masked(&mut response, &Value::Unknown);
        assert_eq!(response, Value::from(""));

        let mut response = Value::from("rotated");
        merge_masked(&mut response, &Value::from("s3cret"));
        assert_eq!(response, Value::from("rotated"));
    }

    #[test]
    fn test_specifications_preserve_order() {
        let raw = json!([
            {"name": "b", "implementation": "GenreSpecification", "negate": false, "required": true,
             "fields": [{"name": "value", "value": ["drama"]}]},
            {"name": "a", "implementation": "SeriesTypeSpecification", "negate": true, "required": false,
             "fields": [{"name": "value", "value": 1}]}
        ]);
        let specs = decode_specifications(&TEST_FAMILY, Some(&raw), "specifications").unwrap();
        let items = specs.as_elements().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].member("name"), &Value::from("b"));
        assert_eq!(items[1].member("value"), &Value::from("1"));
        assert_eq!(items[1].member("negate"), &Value::Bool(true));

        let encoded = encode_specifications(&TEST_FAMILY, &specs, "specifications").unwrap();
        assert_eq!(encoded[0]["name"], "b");
        assert_eq!(encoded[1]["fields"], json!([{"name": "value", "value": 1}]));
    }

    #[test]
    fn test_specification_type_has_core_members() {
        match specification_type(&TEST_FAMILY) {
            AttributeType::List(element) => match *element {
                AttributeType::Object(members) => {
                    assert!(members.contains_key("negate"));
                    assert!(members.contains_key("base_url"));
                },
                other => panic!("unexpected element {:?}", other),
            },
            other => panic!("unexpected type {:?}", other),
        }
    }
}
