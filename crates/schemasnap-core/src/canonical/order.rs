//! Total order over JSON values.
//!
//! Values of different kinds compare by a coarse rank:
//!
//! ```text
//! null < boolean < number < string < mapping < sequence
//! ```
//!
//! Within a rank:
//!
//! - booleans: `false < true`
//! - numbers: by exact numeric value; an integer sorts before a float of
//!   equal value, so `1 < 1.0` and the order stays antisymmetric
//! - strings: byte-wise
//! - mappings: as sequences of `(key, value)` pairs ordered by key, compared
//!   lexicographically; a strict prefix sorts first
//! - sequences: element-wise lexicographic; a strict prefix sorts first

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Object(_) => 4,
        Value::Array(_) => 5,
    }
}

/// Compare two values under the canonical total order.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Object(x), Value::Object(y)) => compare_mappings(x, y),
        (Value::Array(x), Value::Array(y)) => compare_sequences(x, y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (as_integer(a), as_integer(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(x), None) => compare_int_float(x, as_float(b)),
        (None, Some(y)) => compare_int_float(y, as_float(a)).reverse(),
        (None, None) => as_float(a).total_cmp(&as_float(b)),
    }
}

// serde_json numbers are always finite, so the fallback is never taken
fn as_float(n: &Number) -> f64 {
    n.as_f64().unwrap_or(0.0)
}

fn compare_int_float(i: i128, f: f64) -> Ordering {
    if f.fract() == 0.0 && f.abs() < 1e38 {
        i.cmp(&(f as i128)).then(Ordering::Less)
    } else {
        (i as f64).partial_cmp(&f).unwrap_or(Ordering::Equal)
    }
}

fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|(ka, _), (kb, _)| ka.cmp(kb));
    entries
}

/// Compare two mappings irrespective of their key iteration order.
pub fn compare_mappings(a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
    let ea = sorted_entries(a);
    let eb = sorted_entries(b);
    for ((ka, va), (kb, vb)) in ea.iter().zip(eb.iter()) {
        let ord = ka.cmp(kb).then_with(|| compare_values(va, vb));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ea.len().cmp(&eb.len())
}

fn compare_sequences(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = compare_values(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
