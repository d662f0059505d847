//! JSON value helpers shared by the keyword implementations: mathematical
//! number comparison, structural equality, and type naming.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// The seven JSON Schema primitive type names.
pub const PRIMITIVE_TYPES: [&str; 7] = [
    "array", "boolean", "integer", "null", "number", "object", "string",
];

enum NumberRepr {
    Int(i128),
    Float(f64),
}

fn repr(n: &Number) -> NumberRepr {
    if let Some(i) = n.as_i64() {
        NumberRepr::Int(i128::from(i))
    } else if let Some(u) = n.as_u64() {
        NumberRepr::Int(i128::from(u))
    } else {
        NumberRepr::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Compare two JSON numbers by value (`1` and `1.0` are equal).
pub fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (repr(a), repr(b)) {
        (NumberRepr::Int(x), NumberRepr::Int(y)) => Some(x.cmp(&y)),
        (NumberRepr::Int(x), NumberRepr::Float(y)) => (x as f64).partial_cmp(&y),
        (NumberRepr::Float(x), NumberRepr::Int(y)) => x.partial_cmp(&(y as f64)),
        (NumberRepr::Float(x), NumberRepr::Float(y)) => x.partial_cmp(&y),
    }
}

/// Structural JSON equality with mathematical number comparison.
pub fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| equal(x, y)))
        }
        _ => a == b,
    }
}

/// True for numbers with no fractional part, including `1.0`.
pub fn is_integer(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

/// Whether `value` is an instance of the named primitive type.
pub fn has_type(value: &Value, type_name: &str) -> bool {
    match (type_name, value) {
        ("null", Value::Null)
        | ("boolean", Value::Bool(_))
        | ("number", Value::Number(_))
        | ("string", Value::String(_))
        | ("array", Value::Array(_))
        | ("object", Value::Object(_)) => true,
        ("integer", Value::Number(n)) => is_integer(n),
        _ => false,
    }
}

/// The most specific primitive type name of `value`.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if is_integer(n) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether `value` is a multiple of `divisor` (`divisor > 0`).
pub fn is_multiple_of(value: &Number, divisor: &Number) -> bool {
    if let (Some(v), Some(d)) = (value.as_i64(), divisor.as_i64()) {
        return d != 0 && v % d == 0;
    }
    if let (Some(v), Some(d)) = (value.as_u64(), divisor.as_u64()) {
        return d != 0 && v % d == 0;
    }
    let (Some(v), Some(d)) = (value.as_f64(), divisor.as_f64()) else {
        return false;
    };
    let quotient = v / d;
    if !quotient.is_finite() {
        return false;
    }
    (quotient - quotient.round()).abs() <= f64::EPSILON * quotient.abs().max(1.0) * 4.0
}

/// A short rendering of `value` for error messages.
pub fn preview(value: &Value) -> String {
    const LIMIT: usize = 64;
    let rendered = value.to_string();
    if rendered.chars().count() <= LIMIT {
        rendered
    } else {
        let head: String = rendered.chars().take(LIMIT).collect();
        format!("{head}...")
    }
}
