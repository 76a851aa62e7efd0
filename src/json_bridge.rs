//! JSON <-> native Value conversion

use crate::codec::{decode_item, encode_item};
use crate::error::*;
use crate::types::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};

/// Convert JSON value to a native Value
pub fn from_json(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(arr) => Value::List(arr.iter().map(from_json).collect()),
        JsonValue::Object(obj) => {
            Value::Map(obj.iter().map(|(k, v)| (k.clone(), from_json(v))).collect())
        }
    }
}

/// Convert a native Value to JSON.
///
/// Non-finite numbers become `null`. Undefined map entries are dropped;
/// undefined list elements and roots become `null`.
pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Undefined | Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => json_number(*n),
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::List(items) => JsonValue::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => {
            let mut map = Map::new();
            for (key, v) in entries {
                if !v.is_undefined() {
                    map.insert(key.clone(), to_json(v));
                }
            }
            JsonValue::Object(map)
        }
    }
}

/// Whole numbers within the exact integer range keep an integer JSON form
fn json_number(n: f64) -> JsonValue {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        return JsonValue::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Parse JSON string to a native Value
pub fn parse_json(json_str: &str) -> Result<Value> {
    let json: JsonValue = serde_json::from_str(json_str)?;
    Ok(from_json(&json))
}

/// Stringify a native Value to a JSON string
pub fn stringify_json(value: &Value) -> String {
    to_json(value).to_string()
}

/// Serialize any serde type into a native Value
pub fn to_value<T: Serialize>(data: &T) -> Result<Value> {
    Ok(from_json(&serde_json::to_value(data)?))
}

/// Deserialize a serde type out of a native Value
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    Ok(serde_json::from_value(to_json(value))?)
}

/// Serialize a serde type straight into a wire item
pub fn to_item<T: Serialize>(data: &T) -> Result<Item> {
    encode_item(&to_value(data)?)
}

/// Deserialize a serde type from a wire item
pub fn from_item<T: DeserializeOwned>(item: &Item) -> Result<T> {
    from_value(&decode_item(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_from_json_null() {
        assert!(from_json(&json!(null)).is_null());
    }

    #[test]
    fn test_from_json_number() {
        assert_eq!(from_json(&json!(42)).as_number(), Some(42.0));
        assert_eq!(from_json(&json!(3.14)).as_number(), Some(3.14));
    }

    #[test]
    fn test_from_json_object() {
        let v = from_json(&json!({"a": 1, "b": [true]}));
        assert!(v.is_map());
        assert_eq!(v.get("a").and_then(Value::as_number), Some(1.0));
        assert_eq!(v.get("b").and_then(|b| b.index(0)).and_then(Value::as_bool), Some(true));
    }

    #[test]
    fn test_to_json_drops_undefined_entries() {
        let v = Value::map([field("kept", 1i64), ("gone".to_string(), Value::Undefined)]);
        assert_eq!(to_json(&v), json!({"kept": 1}));

        let list = Value::list(vec![Value::Undefined, Value::bool(false)]);
        assert_eq!(to_json(&list), json!([null, false]));
    }

    #[test]
    fn test_to_json_non_finite_is_null() {
        assert_eq!(to_json(&Value::number(f64::NAN)), json!(null));
        assert_eq!(to_json(&Value::number(f64::INFINITY)), json!(null));
    }

    #[test]
    fn test_roundtrip() {
        let original = json!({
            "name": "Alice",
            "age": 30,
            "active": true,
            "scores": [95, 87.5, 92]
        });

        let restored = to_json(&from_json(&original));
        assert_eq!(original, restored);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Route {
        route: String,
        stops: Vec<u32>,
        express: bool,
    }

    #[test]
    fn test_serde_item_roundtrip() {
        let route = Route {
            route: "46A".into(),
            stops: vec![2068, 765],
            express: false,
        };

        let item = to_item(&route).unwrap();
        assert_eq!(item.get("route"), Some(&AttributeValue::S("46A".into())));
        assert_eq!(
            item.get("stops"),
            Some(&AttributeValue::Ns(vec!["2068".into(), "765".into()]))
        );
        assert_eq!(from_item::<Route>(&item).unwrap(), route);
    }

    #[test]
    fn test_to_item_rejects_scalars() {
        let err = to_item(&"just a string").unwrap_err();
        assert!(err.is_type_mismatch());
    }
}
