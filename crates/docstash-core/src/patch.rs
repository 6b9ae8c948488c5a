//! Partial document updates
//!
//! A [`Patch`] is an ordered list of field changes addressed by dot-path.
//! `DocumentReference::update` builds one from a JSON object; callers that
//! need read-modify-write semantics (counters, timestamps, tag lists) build
//! one directly so the change is applied under a single write lock.
//!
//! ```ignore
//! let patch = Patch::new()
//!     .increment("usage.credits", 1)
//!     .server_timestamp("updatedAt");
//! users.doc("u1").patch(patch).await?;
//! ```

use chrono::{SecondsFormat, Utc};
use serde_json::{Number, Value};

use crate::error::{StoreError, StoreResult};
use crate::value::{self, values_equal, DocumentData};

/// A single change to one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    /// Overwrite the field
    Set(Value),
    /// Add a number to the field (missing or non-numeric counts as 0)
    Increment(Number),
    /// Remove the field
    Delete,
    /// Set the field to the current UTC time as an RFC 3339 string
    ServerTimestamp,
    /// Append each value not already present in the array
    ArrayUnion(Vec<Value>),
    /// Remove every element equal to one of the values
    ArrayRemove(Vec<Value>),
}

impl FieldChange {
    fn apply(&self, data: &mut DocumentData, path: &str) -> StoreResult<()> {
        match self {
            FieldChange::Set(value) => value::set_path(data, path, value.clone()),
            FieldChange::Increment(delta) => {
                let sum = value::add_numbers(value::resolve(data, path), delta).ok_or_else(
                    || StoreError::InvalidData(format!("increment overflow at '{}'", path)),
                )?;
                value::set_path(data, path, sum);
            }
            FieldChange::Delete => {
                value::remove_path(data, path);
            }
            FieldChange::ServerTimestamp => {
                let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                value::set_path(data, path, Value::String(now));
            }
            FieldChange::ArrayUnion(values) => {
                value::modify_path(data, path, |current| {
                    let mut items = match current {
                        Some(Value::Array(items)) => items,
                        _ => Vec::new(),
                    };
                    for candidate in values {
                        if !items.iter().any(|item| values_equal(item, candidate)) {
                            items.push(candidate.clone());
                        }
                    }
                    Value::Array(items)
                });
            }
            FieldChange::ArrayRemove(values) => {
                value::modify_path(data, path, |current| {
                    let mut items = match current {
                        Some(Value::Array(items)) => items,
                        _ => Vec::new(),
                    };
                    items.retain(|item| !values.iter().any(|v| values_equal(item, v)));
                    Value::Array(items)
                });
            }
        }
        Ok(())
    }
}

/// Ordered set of field changes applied as one write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    changes: Vec<(String, FieldChange)>,
}

impl Patch {
    /// Create an empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a patch of `Set` changes from a JSON object
    ///
    /// Keys may be dot-paths (`"usage.credits"`); a key without a separator
    /// replaces the whole top-level field.
    pub fn from_value(partial: Value) -> StoreResult<Self> {
        let partial = value::into_object(partial)
            .ok_or_else(|| StoreError::not_an_object("update data"))?;

        Ok(Self {
            changes: partial
                .into_iter()
                .map(|(path, value)| (path, FieldChange::Set(value)))
                .collect(),
        })
    }

    /// Add an arbitrary change
    pub fn change(mut self, path: impl Into<String>, change: FieldChange) -> Self {
        self.changes.push((path.into(), change));
        self
    }

    pub fn set(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.change(path, FieldChange::Set(value.into()))
    }

    pub fn increment(self, path: impl Into<String>, delta: impl Into<Number>) -> Self {
        self.change(path, FieldChange::Increment(delta.into()))
    }

    pub fn delete(self, path: impl Into<String>) -> Self {
        self.change(path, FieldChange::Delete)
    }

    pub fn server_timestamp(self, path: impl Into<String>) -> Self {
        self.change(path, FieldChange::ServerTimestamp)
    }

    pub fn array_union(self, path: impl Into<String>, values: Vec<Value>) -> Self {
        self.change(path, FieldChange::ArrayUnion(values))
    }

    pub fn array_remove(self, path: impl Into<String>, values: Vec<Value>) -> Self {
        self.change(path, FieldChange::ArrayRemove(values))
    }

    /// Number of field changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply every change, in order, to `data`
    ///
    /// Stops at the first failing change; `data` may then hold the earlier
    /// changes, so callers apply to a copy.
    pub(crate) fn apply_to(&self, data: &mut DocumentData) -> StoreResult<()> {
        for (path, change) in &self.changes {
            change.apply(data, path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> DocumentData {
        value::into_object(value).unwrap()
    }

    #[test]
    fn test_from_value_merges_dot_paths() {
        let mut data = doc(json!({"a": 1, "b": {"c": 2}}));
        Patch::from_value(json!({"b.c": 3}))
            .unwrap()
            .apply_to(&mut data)
            .unwrap();

        assert_eq!(Value::Object(data), json!({"a": 1, "b": {"c": 3}}));
    }

    #[test]
    fn test_from_value_top_level_key_replaces() {
        let mut data = doc(json!({"a": 1, "b": {"c": 2, "d": 4}}));
        Patch::from_value(json!({"b": {"c": 3}}))
            .unwrap()
            .apply_to(&mut data)
            .unwrap();

        assert_eq!(Value::Object(data), json!({"a": 1, "b": {"c": 3}}));
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        let err = Patch::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn test_increment() {
        let mut data = doc(json!({"usage": {"credits": 5}}));
        Patch::new()
            .increment("usage.credits", 1)
            .increment("usage.exports", 2)
            .apply_to(&mut data)
            .unwrap();

        assert_eq!(
            Value::Object(data),
            json!({"usage": {"credits": 6, "exports": 2}})
        );
    }

    #[test]
    fn test_delete_and_set() {
        let mut data = doc(json!({"a": 1, "b": {"c": 2, "d": 3}}));
        Patch::new()
            .delete("b.c")
            .delete("missing.field")
            .set("e", "x")
            .apply_to(&mut data)
            .unwrap();

        assert_eq!(Value::Object(data), json!({"a": 1, "b": {"d": 3}, "e": "x"}));
    }

    #[test]
    fn test_server_timestamp() {
        let mut data = DocumentData::new();
        Patch::new()
            .server_timestamp("meta.updatedAt")
            .apply_to(&mut data)
            .unwrap();

        let stamp = value::resolve(&data, "meta.updatedAt")
            .and_then(Value::as_str)
            .unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_array_union_and_remove() {
        let mut data = doc(json!({"tags": ["a", "b"]}));
        Patch::new()
            .array_union("tags", vec![json!("b"), json!("c")])
            .array_remove("tags", vec![json!("a")])
            .array_union("fresh", vec![json!(1)])
            .apply_to(&mut data)
            .unwrap();

        assert_eq!(
            Value::Object(data),
            json!({"tags": ["b", "c"], "fresh": [1]})
        );
    }

    #[test]
    fn test_changes_apply_in_order() {
        let mut data = DocumentData::new();
        let patch = Patch::new().set("n", 1).increment("n", 1).set("n", 10);
        assert_eq!(patch.len(), 3);
        patch.apply_to(&mut data).unwrap();

        assert_eq!(data.get("n"), Some(&json!(10)));
    }

    #[test]
    fn test_increment_overflow_is_an_error() {
        let mut data = doc(json!({"n": 1.7e308}));
        let err = Patch::new()
            .increment("n", Number::from_f64(1.7e308).unwrap())
            .apply_to(&mut data)
            .unwrap_err();

        match err {
            StoreError::InvalidData(msg) => assert!(msg.contains("'n'"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(data.get("n"), Some(&json!(1.7e308)));
    }
}
