//! Native value <-> wire attribute-value codec
//!
//! `encode` and `decode` are pure recursive tree transforms; they hold no
//! state and never log.

use crate::error::*;
use crate::types::*;
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest numeric prefix accepted by [`parse_number`]
static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)")
        .expect("numeric prefix pattern compiles")
});

/// Encode a native value into its tagged wire form
pub fn encode(value: &Value) -> Result<AttributeValue> {
    match value {
        Value::List(items) => encode_list(items),
        Value::Number(n) => Ok(AttributeValue::N(format_number(*n))),
        Value::Str(s) => Ok(AttributeValue::S(s.clone())),
        Value::Bool(b) => Ok(AttributeValue::Bool(*b)),
        Value::Map(entries) => {
            let mut map = Item::new();
            for (key, v) in entries {
                map.insert(key.clone(), encode(v)?);
            }
            Ok(AttributeValue::M(map))
        }
        Value::Null => Ok(AttributeValue::Null(true)),
        Value::Undefined => Err(CodecError::type_mismatch("does not support mapping undefined")),
    }
}

fn encode_list(items: &[Value]) -> Result<AttributeValue> {
    if !items.is_empty() && items.iter().all(Value::is_number) {
        let nums = items
            .iter()
            .filter_map(Value::as_number)
            .map(format_number)
            .collect();
        return Ok(AttributeValue::Ns(nums));
    }

    if !items.is_empty() && items.iter().all(Value::is_str) {
        let strs = items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        return Ok(AttributeValue::Ss(strs));
    }

    // Vacuously true for the empty list, which therefore becomes `L: []`
    if items.iter().all(Value::is_object) {
        let encoded = items.iter().map(encode).collect::<Result<Vec<_>>>()?;
        return Ok(AttributeValue::L(encoded));
    }

    Err(CodecError::type_mismatch(
        "expected a homogeneous array of numbers or strings",
    ))
}

/// Encode a map value as a top-level item
pub fn encode_item(value: &Value) -> Result<Item> {
    match value {
        Value::Map(_) => match encode(value)? {
            AttributeValue::M(item) => Ok(item),
            other => Err(CodecError::type_mismatch(format!(
                "expected a map at the item root, got {}",
                other.tag()
            ))),
        },
        Value::Undefined => Err(CodecError::type_mismatch("does not support mapping undefined")),
        _ => Err(CodecError::type_mismatch("expected a map at the item root")),
    }
}

/// Decode a wire value into a native value; total over well-formed input
pub fn decode(wire: &AttributeValue) -> Value {
    match wire {
        AttributeValue::M(map) => decode_item(map),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::S(s) => Value::Str(s.clone()),
        AttributeValue::Ss(strs) => Value::List(strs.iter().cloned().map(Value::Str).collect()),
        AttributeValue::N(n) => Value::Number(parse_number(n)),
        AttributeValue::Ns(nums) => {
            Value::List(nums.iter().map(|n| Value::Number(parse_number(n))).collect())
        }
        AttributeValue::L(items) => Value::List(items.iter().map(decode).collect()),
        AttributeValue::Null(_) => Value::Null,
    }
}

/// Decode every attribute of an item into a native map
pub fn decode_item(item: &Item) -> Value {
    Value::Map(item.iter().map(|(k, v)| (k.clone(), decode(v))).collect())
}

// ============================================================
// Number text
// ============================================================

/// Render a number in its decimal string form.
///
/// Integral values print without a fraction and `-0` prints as `0`.
/// Magnitudes of at least `1e21` or below `1e-6` switch to exponent form
/// (`1e+21`, `1.5e-7`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }

    let exp = format!("{:e}", n);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
}

/// Parse the longest numeric prefix of `text`, skipping leading whitespace.
///
/// Text without a numeric prefix yields NaN rather than an error.
pub fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let Some(m) = NUMERIC_PREFIX.find(trimmed) else {
        return f64::NAN;
    };

    let digits = m.as_str();
    match digits.trim_start_matches(['+', '-']) {
        "Infinity" if digits.starts_with('-') => f64::NEG_INFINITY,
        "Infinity" => f64::INFINITY,
        _ => digits.parse().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_integral() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-7.0), "-7");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }

    #[test]
    fn test_format_fraction() {
        assert_eq!(format_number(3.14), "3.14");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn test_format_exponent() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(-2.5e300), "-2.5e+300");
    }

    #[test]
    fn test_format_non_finite() {
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_parse_lenient_prefix() {
        assert_eq!(parse_number("12abc"), 12.0);
        assert_eq!(parse_number("  1e3"), 1000.0);
        assert_eq!(parse_number("-0.5"), -0.5);
        assert_eq!(parse_number(".25"), 0.25);
        assert_eq!(parse_number("7."), 7.0);
        assert_eq!(parse_number("3e"), 3.0);
        assert_eq!(parse_number("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_parse_without_digits_is_nan() {
        assert!(parse_number("abc").is_nan());
        assert!(parse_number("").is_nan());
        assert!(parse_number("NaN").is_nan());
    }

    #[test]
    fn test_formatted_numbers_parse_back() {
        for n in [0.0, 1.0, -1.0, 0.1, 1e21, 1.5e-7, 123456.789, f64::MAX, f64::MIN_POSITIVE] {
            assert_eq!(parse_number(&format_number(n)), n, "{n}");
        }
    }

    #[test]
    fn test_encode_item_requires_map() {
        let err = encode_item(&Value::str("x")).unwrap_err();
        assert!(err.is_type_mismatch());

        let item = encode_item(&Value::map([field("a", 1i64)])).unwrap();
        assert_eq!(item.get("a"), Some(&AttributeValue::N("1".into())));
    }

    #[test]
    fn test_decode_null_ignores_payload() {
        assert_eq!(decode(&AttributeValue::Null(false)), Value::Null);
    }
}
