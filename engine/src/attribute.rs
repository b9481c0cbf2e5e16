//! Type-tagged transport values.
//!
//! Change-stream item images arrive as maps where every scalar is wrapped
//! with its storage type (`{"S": "..."}`, `{"N": "1"}`, and so on). This
//! module is the only place that shape is allowed to exist; everything past
//! the codec works with plain JSON or [`ResourceRecord`]s.
//!
//! [`ResourceRecord`]: crate::ResourceRecord

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A transport attribute map, as found in `Keys`, `NewImage` and `OldImage`.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// A single type-tagged transport value.
///
/// The externally-tagged serde representation matches the wire shape
/// exactly: `AttrValue::S("x")` serializes as `{"S": "x"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    #[serde(rename = "S")]
    S(String),
    /// Numbers travel as strings to avoid transport-side precision loss.
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "M")]
    M(AttrMap),
    #[serde(rename = "L")]
    L(Vec<AttrValue>),
    #[serde(rename = "NULL")]
    Null(bool),
}

impl AttrValue {
    /// Convert into plain JSON.
    ///
    /// Integer/float distinction is preserved: an `N` payload with no
    /// fractional part becomes a JSON integer, anything else a float.
    /// Unparseable numbers fall back to the raw string rather than failing
    /// the whole record.
    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::S(s) => Value::String(s.clone()),
            AttrValue::N(n) => number_from_str(n),
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::M(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            AttrValue::L(items) => Value::Array(items.iter().map(AttrValue::to_json).collect()),
            AttrValue::Null(_) => Value::Null,
        }
    }

    /// Wrap plain JSON back into the type-tagged shape.
    pub fn from_json(value: &Value) -> AttrValue {
        match value {
            Value::Null => AttrValue::Null(true),
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::Number(n) => AttrValue::N(n.to_string()),
            Value::String(s) => AttrValue::S(s.clone()),
            Value::Array(items) => AttrValue::L(items.iter().map(AttrValue::from_json).collect()),
            Value::Object(map) => AttrValue::M(
                map.iter()
                    .map(|(k, v)| (k.clone(), AttrValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Borrow the string payload of an `S` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::S(s) => Some(s),
            _ => None,
        }
    }
}

fn number_from_str(raw: &str) -> Value {
    if !raw.contains('.') && !raw.contains('e') && !raw.contains('E') {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Number(Number::from(i));
        }
        if let Ok(u) = raw.parse::<u64>() {
            return Value::Number(Number::from(u));
        }
        // Integers wider than u64 keep their exact digits rather than
        // collapsing into a nearby f64.
        return Value::String(raw.to_string());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// Convert an attribute map to a JSON object map.
pub fn attrs_to_json(attrs: &AttrMap) -> Map<String, Value> {
    attrs
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

/// Convert a JSON object map to an attribute map.
pub fn attrs_from_json(map: &Map<String, Value>) -> AttrMap {
    map.iter()
        .map(|(k, v)| (k.clone(), AttrValue::from_json(v)))
        .collect()
}
