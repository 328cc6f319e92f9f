//! Value bridge between engine-typed attribute values and plain JSON.
//!
//! The engine hands the provider state as JSON where every attribute is either
//! a concrete value, `null`, or the unknown marker [`UNKNOWN_VALUE`]. The
//! upstream service speaks camelCase JSON and knows nothing about unknowns.
//! [`Value`] keeps the three-state distinction (known / null / unknown) while
//! data moves between the two worlds:
//!
//! - [`Value::from_state`] / [`Value::to_state`] convert engine state JSON;
//! - [`to_plain`] turns a value into an upstream payload fragment (null is
//!   omitted, unknown is an error);
//! - [`from_plain`] decodes an upstream fragment against a declared type.

use std::collections::BTreeMap;

use heck::ToLowerCamelCase;
use serde_json::{Map, Number, Value as Json};

use crate::error::ProviderError;
use crate::schema::{AttributeType, Schema};

/// Marker the engine uses for values that will only be known after apply.
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

static NULL: Value = Value::Null;

/// An engine-typed value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Not known until apply.
    Unknown,
    /// Explicitly absent.
    Null,
    /// A string.
    String(String),
    /// A 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// An ordered sequence; equality is position-wise.
    List(Vec<Value>),
    /// An unordered collection; equality is multiset equality.
    Set(Vec<Value>),
    /// String-keyed values of one type.
    Map(BTreeMap<String, Value>),
    /// An object with a fixed attribute set.
    Object(BTreeMap<String, Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unknown, Value::Unknown) | (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => multiset_eq(a, b),
            (Value::Map(a), Value::Map(b)) | (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

fn multiset_eq(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    'outer: for x in a {
        for (i, y) in b.iter().enumerate() {
            if !used[i] && x == y {
                used[i] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

impl Value {
    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value is the unknown marker.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Whether neither this value nor anything nested in it is unknown.
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown => false,
            Value::List(items) | Value::Set(items) => items.iter().all(Value::is_wholly_known),
            Value::Map(items) | Value::Object(items) => {
                items.values().all(Value::is_wholly_known)
            },
            _ => true,
        }
    }

    /// The string, if this is a known string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, if this is a known integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The boolean, if this is a known boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Elements of a list or set.
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Members of an object or map.
    pub fn as_members(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(members) | Value::Map(members) => Some(members),
            _ => None,
        }
    }

    /// Member of an object by name; null when absent.
    pub fn member(&self, name: &str) -> &Value {
        self.as_members()
            .and_then(|members| members.get(name))
            .unwrap_or(&NULL)
    }

    /// Whether this is a list/set with no elements, or null.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::Null => true,
            Value::List(items) | Value::Set(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Decode engine state JSON against a declared type.
    pub fn from_state(json: &Json, ty: &AttributeType, path: &str) -> Result<Value, ProviderError> {
        decode(Some(json), ty, path, Keys::State)
    }

    /// Encode the value as engine state JSON.
    ///
    /// Set elements are emitted in a canonical order so unchanged upstream data
    /// always yields byte-identical state.
    pub fn to_state(&self) -> Json {
        match self {
            Value::Unknown => Json::String(UNKNOWN_VALUE.to_string()),
            Value::Null => Json::Null,
            Value::String(s) => Json::String(s.clone()),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
            Value::Bool(b) => Json::Bool(*b),
            Value::List(items) => Json::Array(items.iter().map(Value::to_state).collect()),
            Value::Set(items) => {
                let mut encoded: Vec<(String, Json)> = items
                    .iter()
                    .map(|item| {
                        let json = item.to_state();
                        (json.to_string(), json)
                    })
                    .collect();
                encoded.sort_by(|a, b| a.0.cmp(&b.0));
                Json::Array(encoded.into_iter().map(|(_, json)| json).collect())
            },
            Value::Map(members) | Value::Object(members) => Json::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_state()))
                    .collect(),
            ),
        }
    }

    /// Convert arbitrary JSON without a declared type.
    pub fn from_json_untyped(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) if s == UNKNOWN_VALUE => Value::Unknown,
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json_untyped).collect()),
            Json::Object(members) => Value::Map(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json_untyped(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Convert a value into an upstream payload fragment.
///
/// Returns `Ok(None)` for null so callers can omit the key entirely. Object
/// member names are rendered in the upstream's lowerCamelCase convention and
/// null members are omitted.
pub fn to_plain(value: &Value, path: &str) -> Result<Option<Json>, ProviderError> {
    let json = match value {
        Value::Unknown => return Err(ProviderError::EncodeUnknown(path.to_string())),
        Value::Null => return Ok(None),
        Value::String(s) => Json::String(s.clone()),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(n) => Json::Number(n),
            None => {
                return Err(ProviderError::validation(
                    path,
                    "value is not a finite number",
                ))
            },
        },
        Value::Bool(b) => Json::Bool(*b),
        Value::List(items) | Value::Set(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(to_plain(item, &index_path(path, i))?.unwrap_or(Json::Null));
            }
            Json::Array(out)
        },
        Value::Map(members) => {
            let mut out = Map::new();
            for (key, member) in members {
                if let Some(json) = to_plain(member, &join_path(path, key))? {
                    out.insert(key.clone(), json);
                }
            }
            Json::Object(out)
        },
        Value::Object(members) => {
            let mut out = Map::new();
            for (name, member) in members {
                if let Some(json) = to_plain(member, &join_path(path, name))? {
                    out.insert(name.to_lower_camel_case(), json);
                }
            }
            Json::Object(out)
        },
    };
    Ok(Some(json))
}

/// Decode an upstream fragment against a declared type.
///
/// A missing key and JSON null both decode to [`Value::Null`]. Objects come
/// back with every declared member present, missing ones as null.
pub fn from_plain(raw: Option<&Json>, ty: &AttributeType, path: &str) -> Result<Value, ProviderError> {
    decode(raw, ty, path, Keys::Upstream)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Keys {
    State,
    Upstream,
}

fn decode(raw: Option<&Json>, ty: &AttributeType, path: &str, keys: Keys) -> Result<Value, ProviderError> {
    let json = match raw {
        None | Some(Json::Null) => return Ok(Value::Null),
        Some(Json::String(s)) if keys == Keys::State && s == UNKNOWN_VALUE => {
            return Ok(Value::Unknown)
        },
        Some(json) => json,
    };

    match ty {
        AttributeType::String => match json {
            Json::String(s) => Ok(Value::String(s.clone())),
            other => Err(mismatch(path, ty, other)),
        },
        AttributeType::Int64 => decode_int(json, path),
        AttributeType::Float64 => match json {
            Json::Number(n) => Ok(Value::Float(n.as_f64().unwrap_or_default())),
            other => Err(mismatch(path, ty, other)),
        },
        AttributeType::Bool => match json {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(mismatch(path, ty, other)),
        },
        AttributeType::List(element) | AttributeType::Set(element) => {
            let items = json.as_array().ok_or_else(|| mismatch(path, ty, json))?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(decode(Some(item), element, &index_path(path, i), keys)?);
            }
            if matches!(ty, AttributeType::Set(_)) {
                Ok(Value::Set(out))
            } else {
                Ok(Value::List(out))
            }
        },
        AttributeType::Map(element) => {
            let members = json.as_object().ok_or_else(|| mismatch(path, ty, json))?;
            let mut out = BTreeMap::new();
            for (key, member) in members {
                out.insert(
                    key.clone(),
                    decode(Some(member), element, &join_path(path, key), keys)?,
                );
            }
            Ok(Value::Map(out))
        },
        AttributeType::Object(attrs) => {
            let members = json.as_object().ok_or_else(|| mismatch(path, ty, json))?;
            let mut out = BTreeMap::new();
            for (name, attr_ty) in attrs {
                let member = match keys {
                    Keys::State => members.get(name),
                    Keys::Upstream => members
                        .get(&name.to_lower_camel_case())
                        .or_else(|| members.get(name)),
                };
                out.insert(
                    name.clone(),
                    decode(member, attr_ty, &join_path(path, name), keys)?,
                );
            }
            Ok(Value::Object(out))
        },
        AttributeType::Dynamic => Ok(Value::from_json_untyped(json)),
    }
}

fn decode_int(json: &Json, path: &str) -> Result<Value, ProviderError> {
    let n = match json {
        Json::Number(n) => n,
        other => return Err(mismatch(path, &AttributeType::Int64, other)),
    };
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    if n.is_u64() {
        return Err(ProviderError::DecodeOverflow {
            path: path.to_string(),
            value: n.to_string(),
        });
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    if f.fract() != 0.0 || f.is_nan() {
        return Err(ProviderError::DecodeTypeMismatch {
            path: path.to_string(),
            expected: "int64".to_string(),
            got: format!("non-integral number {}", n),
        });
    }
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(ProviderError::DecodeOverflow {
            path: path.to_string(),
            value: n.to_string(),
        });
    }
    Ok(Value::Int(f as i64))
}

fn mismatch(path: &str, ty: &AttributeType, got: &Json) -> ProviderError {
    ProviderError::DecodeTypeMismatch {
        path: path.to_string(),
        expected: ty.type_name().to_string(),
        got: json_type_name(got).to_string(),
    }
}

/// JSON type name used in diagnostics.
pub fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

pub(crate) fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

pub(crate) fn index_path(base: &str, index: usize) -> String {
    format!("{}.{}", base, index)
}

/// A flat record of engine-typed attribute values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct State {
    values: BTreeMap<String, Value>,
}

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode engine state JSON; every schema attribute is populated.
    pub fn from_json(json: &Json, schema: &Schema) -> Result<Self, ProviderError> {
        let members = match json {
            Json::Object(members) => Some(members),
            Json::Null => None,
            other => {
                return Err(ProviderError::DecodeTypeMismatch {
                    path: String::new(),
                    expected: "object".to_string(),
                    got: json_type_name(other).to_string(),
                })
            },
        };
        let null = Json::Null;
        let mut state = State::new();
        for (name, attr) in schema.attributes() {
            let raw = members.and_then(|m| m.get(name)).unwrap_or(&null);
            state.set(name.clone(), Value::from_state(raw, &attr.attr_type, name)?);
        }
        Ok(state)
    }

    /// Build a state from an object value.
    pub fn from_object(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            _ => Self::new(),
        }
    }

    /// Encode as engine state JSON.
    pub fn to_json(&self) -> Json {
        Json::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_state()))
                .collect(),
        )
    }

    /// The state as an object value.
    pub fn into_object(self) -> Value {
        Value::Object(self.values)
    }

    /// Attribute value; null when absent.
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&NULL)
    }

    /// Set an attribute value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`State::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Known string attribute.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).as_str()
    }

    /// Known integer attribute.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).as_i64()
    }

    /// Known boolean attribute.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).as_bool()
    }

    /// The server-assigned id.
    pub fn id(&self) -> Option<i64> {
        self.int("id")
    }

    /// Iterate attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl FromIterator<(String, Value)> for State {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    #[test]
    fn test_null_and_missing_decode_to_null() {
        assert_eq!(from_plain(None, &AttributeType::String, "x").unwrap(), Value::Null);
        assert_eq!(
            from_plain(Some(&Json::Null), &AttributeType::Int64, "x").unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_unknown_is_preserved_in_state_but_rejected_on_write() {
        let raw = json!(UNKNOWN_VALUE);
        let value = Value::from_state(&raw, &AttributeType::Int64, "id").unwrap();
        assert!(value.is_unknown());
        assert_eq!(value.to_state(), raw);

        let err = to_plain(&value, "id").unwrap_err();
        assert!(matches!(err, ProviderError::EncodeUnknown(path) if path == "id"));
    }

    #[test]
    fn test_upstream_never_produces_unknown() {
        let value = from_plain(Some(&json!(UNKNOWN_VALUE)), &AttributeType::String, "x").unwrap();
        assert_eq!(value, Value::String(UNKNOWN_VALUE.to_string()));
    }

    #[test]
    fn test_integer_widening() {
        let value = from_plain(Some(&json!(42.0)), &AttributeType::Int64, "n").unwrap();
        assert_eq!(value, Value::Int(42));

        let err = from_plain(Some(&json!(42.5)), &AttributeType::Int64, "n").unwrap_err();
        assert!(matches!(err, ProviderError::DecodeTypeMismatch { .. }));

        let err = from_plain(Some(&json!(u64::MAX)), &AttributeType::Int64, "n").unwrap_err();
        assert!(matches!(err, ProviderError::DecodeOverflow { .. }));

        let err = from_plain(Some(&json!(1e300)), &AttributeType::Int64, "n").unwrap_err();
        assert!(matches!(err, ProviderError::DecodeOverflow { .. }));
    }

    #[test]
    fn test_type_mismatch_reports_path() {
        let ty = AttributeType::list(AttributeType::String);
        let err = from_plain(Some(&json!(["a", 1])), &ty, "tags").unwrap_err();
        match err {
            ProviderError::DecodeTypeMismatch { path, expected, got } => {
                assert_eq!(path, "tags.1");
                assert_eq!(expected, "string");
                assert_eq!(got, "number");
            },
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_set_equality_is_multiset() {
        let a = Value::Set(vec![Value::Int(1), Value::Int(2), Value::Int(2)]);
        let b = Value::Set(vec![Value::Int(2), Value::Int(1), Value::Int(2)]);
        let c = Value::Set(vec![Value::Int(1), Value::Int(1), Value::Int(2)]);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let l1 = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let l2 = Value::List(vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(l1, l2);
    }

    #[test]
    fn test_set_state_output_is_stable() {
        let a = Value::Set(vec![Value::Int(3), Value::Int(1)]);
        let b = Value::Set(vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(a.to_state().to_string(), b.to_state().to_string());
    }

    #[test]
    fn test_object_decode_materializes_missing_members() {
        let ty = AttributeType::object([
            ("cover_type", AttributeType::String),
            ("remote_url", AttributeType::String),
            ("url", AttributeType::String),
        ]);
        let value = from_plain(Some(&json!({"coverType": "poster", "url": "/p.jpg"})), &ty, "image").unwrap();
        assert_eq!(value.member("cover_type"), &Value::from("poster"));
        assert_eq!(value.member("remote_url"), &Value::Null);
        assert_eq!(value.member("url"), &Value::from("/p.jpg"));
    }

    #[test]
    fn test_to_plain_omits_nulls_and_camel_cases_objects() {
        let mut members = BTreeMap::new();
        members.insert("season_number".to_string(), Value::Int(1));
        members.insert("monitored".to_string(), Value::Null);
        let json = to_plain(&Value::Object(members), "season").unwrap().unwrap();
        assert_eq!(json, json!({"seasonNumber": 1}));

        assert_eq!(to_plain(&Value::Null, "x").unwrap(), None);
    }

    #[test]
    fn test_state_round_trip() {
        let schema = Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_attribute("label", Attribute::required_string())
            .with_attribute(
                "tags",
                Attribute::new(
                    AttributeType::set(AttributeType::Int64),
                    crate::schema::AttributeFlags::optional(),
                ),
            );
        let state = State::from_json(&json!({"id": UNKNOWN_VALUE, "label": "eng"}), &schema).unwrap();
        assert!(state.get("id").is_unknown());
        assert_eq!(state.str("label"), Some("eng"));
        assert!(state.get("tags").is_null());

        let again = State::from_json(&state.to_json(), &schema).unwrap();
        assert_eq!(state, again);
    }
}
