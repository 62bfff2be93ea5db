//! Lenient integer parsing shared by query and body handling.

use serde_json::Value;

/// Parse the leading decimal integer of `input`, ignoring leading whitespace and
/// anything after the digits. `"42abc"` yields 42, `"abc"` yields `None`.
pub fn parse_int_prefix(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Coerce a JSON value to an integer: numbers truncate toward zero, strings use
/// [`parse_int_prefix`]. Numbers outside the `i64` range and everything else
/// yield `None`.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .map(f64::trunc)
                .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => parse_int_prefix(text),
        _ => None,
    }
}
