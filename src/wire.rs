//! Raw wire JSON handling
//!
//! [`decode_wire`] is the lenient decoder used on responses straight off the
//! network: it dispatches on whichever tag key is present and degrades to a
//! best-effort passthrough for anything it does not recognise. The strict
//! helpers go through the typed [`AttributeValue`] instead.

use crate::codec::{encode, parse_number};
use crate::error::*;
use crate::json_bridge::from_json;
use crate::types::*;
use serde_json::{Map, Value as JsonValue};

/// Tag keys in the order they are probed
const TAG_ORDER: [&str; 8] = ["M", "BOOL", "S", "SS", "N", "NS", "L", "NULL"];

/// Decode raw wire JSON into a native value. Never fails.
pub fn decode_wire(wire: &JsonValue) -> Value {
    match wire {
        JsonValue::Array(items) => Value::List(items.iter().map(decode_wire).collect()),
        JsonValue::Object(obj) => decode_object(obj),
        other => from_json(other),
    }
}

fn decode_object(obj: &Map<String, JsonValue>) -> Value {
    let tagged = TAG_ORDER
        .iter()
        .find_map(|tag| obj.get(*tag).map(|payload| (*tag, payload)));

    match tagged {
        Some(("M", JsonValue::Object(map))) => decode_untagged(map),
        Some(("BOOL" | "S" | "SS", payload)) => from_json(payload),
        Some(("N", payload)) => Value::Number(wire_number(payload)),
        Some(("NS", JsonValue::Array(nums))) => {
            Value::List(nums.iter().map(|n| Value::Number(wire_number(n))).collect())
        }
        Some(("L", JsonValue::Array(items))) => {
            Value::List(items.iter().map(decode_wire).collect())
        }
        Some(("NULL", _)) => Value::Null,
        // Malformed M / NS / L payload
        Some((_, payload)) => decode_wire(payload),
        None => decode_untagged(obj),
    }
}

/// An object without a tag key is an already-unwrapped mapping
fn decode_untagged(obj: &Map<String, JsonValue>) -> Value {
    Value::Map(obj.iter().map(|(k, v)| (k.clone(), decode_wire(v))).collect())
}

fn wire_number(payload: &JsonValue) -> f64 {
    match payload {
        JsonValue::String(s) => parse_number(s),
        JsonValue::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Render a typed wire value as wire JSON
pub fn wire_to_json(wire: &AttributeValue) -> JsonValue {
    let (tag, payload) = match wire {
        AttributeValue::S(s) => ("S", JsonValue::String(s.clone())),
        AttributeValue::N(n) => ("N", JsonValue::String(n.clone())),
        AttributeValue::Ss(strs) => ("SS", string_array(strs)),
        AttributeValue::Ns(nums) => ("NS", string_array(nums)),
        AttributeValue::Bool(b) => ("BOOL", JsonValue::Bool(*b)),
        AttributeValue::Null(b) => ("NULL", JsonValue::Bool(*b)),
        AttributeValue::L(items) => ("L", JsonValue::Array(items.iter().map(wire_to_json).collect())),
        AttributeValue::M(map) => ("M", item_to_json(map)),
    };

    let mut obj = Map::new();
    obj.insert(tag.to_string(), payload);
    JsonValue::Object(obj)
}

/// Render an item as an object of wire values
pub fn item_to_json(item: &Item) -> JsonValue {
    JsonValue::Object(
        item.iter()
            .map(|(k, v)| (k.clone(), wire_to_json(v)))
            .collect(),
    )
}

fn string_array(values: &[String]) -> JsonValue {
    JsonValue::Array(values.iter().cloned().map(JsonValue::String).collect())
}

/// Parse a strictly well-formed wire value
pub fn parse_wire(json_str: &str) -> Result<AttributeValue> {
    Ok(serde_json::from_str(json_str)?)
}

/// Parse a strictly well-formed item
pub fn parse_item(json_str: &str) -> Result<Item> {
    Ok(serde_json::from_str(json_str)?)
}

/// Stringify a wire value as wire JSON
pub fn stringify_wire(wire: &AttributeValue) -> String {
    wire_to_json(wire).to_string()
}

/// Encode a plain JSON document
pub fn encode_json(json: &JsonValue) -> Result<AttributeValue> {
    encode(&from_json(json))
}
