//! Document values and dot-path access
//!
//! Documents are schema-less JSON objects. Nested fields are addressed with
//! dot-paths such as `"profile.name"`; every path helper here works on a
//! `DocumentData` map and never panics on shape mismatches.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

/// Field data of a single document
pub type DocumentData = Map<String, Value>;

/// Separator between segments of a dot-path
pub const FIELD_SEPARATOR: char = '.';

/// Resolve a dot-path inside a document
///
/// Returns `None` ("undefined") when any segment is missing or an
/// intermediate value is not an object. An explicit JSON `null` resolves
/// to `Some(&Value::Null)`.
pub fn resolve<'a>(data: &'a DocumentData, path: &str) -> Option<&'a Value> {
    match path.split_once(FIELD_SEPARATOR) {
        None => data.get(path),
        Some((head, rest)) => match data.get(head) {
            Some(Value::Object(child)) => resolve(child, rest),
            _ => None,
        },
    }
}

/// Replace the leaf at `path` with the result of `f(previous)`
///
/// Intermediate objects are created as needed; an intermediate that holds a
/// non-object value is overwritten with an empty object.
pub(crate) fn modify_path<F>(data: &mut DocumentData, path: &str, f: F)
where
    F: FnOnce(Option<Value>) -> Value,
{
    match path.split_once(FIELD_SEPARATOR) {
        None => {
            let previous = data.remove(path);
            data.insert(path.to_string(), f(previous));
        }
        Some((head, rest)) => {
            let child = data
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                modify_path(child, rest, f);
            }
        }
    }
}

/// Set the leaf at `path`, creating intermediate objects
pub(crate) fn set_path(data: &mut DocumentData, path: &str, value: Value) {
    modify_path(data, path, |_| value);
}

/// Remove the leaf at `path`; missing intermediates are left untouched
pub(crate) fn remove_path(data: &mut DocumentData, path: &str) -> Option<Value> {
    match path.split_once(FIELD_SEPARATOR) {
        None => data.remove(path),
        Some((head, rest)) => match data.get_mut(head) {
            Some(Value::Object(child)) => remove_path(child, rest),
            _ => None,
        },
    }
}

/// Deep-merge `source` into `target`
///
/// Objects present on both sides are merged recursively; every other
/// value in `source` replaces the one in `target`.
pub(crate) fn merge_into(target: &mut DocumentData, source: DocumentData) {
    for (key, value) in source {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                merge_into(existing, incoming);
                continue;
            }
            target.insert(key, Value::Object(incoming));
        } else {
            target.insert(key, value);
        }
    }
}

/// Convert a JSON value into document data
pub(crate) fn into_object(value: Value) -> Option<DocumentData> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Equality used by `==`, `!=`, `in` and array membership
///
/// Plain JSON equality, except that numbers compare by value so `1`
/// equals `1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, a)| y.get(key).is_some_and(|b| values_equal(a, b)))
        }
        _ => a == b,
    }
}

/// Ordering used by range filters and `order_by`
///
/// Numbers compare numerically, strings by bytes, booleans `false < true`.
/// Any other pairing is unordered and yields `None`.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total ordering used when sorting query results
///
/// Values of the same kind use [`compare_values`]; different kinds are
/// ranked booleans, numbers, strings, arrays, objects. Arrays and objects
/// are not ordered among themselves. `null` is ranked first but query
/// sorting handles it separately.
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    compare_values(a, b).unwrap_or(Ordering::Equal)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return Some(a.cmp(&b));
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

/// Add `delta` to a numeric value; anything else counts as zero
///
/// Integer plus integer stays an integer while it fits in `i64`. Returns
/// `None` when the floating-point sum is not finite.
pub(crate) fn add_numbers(current: Option<&Value>, delta: &Number) -> Option<Value> {
    let current = match current {
        Some(Value::Number(n)) => n.clone(),
        _ => Number::from(0),
    };

    if let (Some(a), Some(b)) = (current.as_i64(), delta.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Some(Value::from(sum));
        }
    }

    let sum = current.as_f64().unwrap_or(0.0) + delta.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).map(Value::Number)
}
