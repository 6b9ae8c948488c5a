//! Read results
//!
//! Snapshots own their data: they are filled with copies taken while the
//! store was locked, so holding or consuming one never touches the store.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreResult;
use crate::reference::DocumentReference;
use crate::value::{self, DocumentData};

/// A document as it was when read
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    reference: DocumentReference,
    data: Option<DocumentData>,
}

impl DocumentSnapshot {
    pub(crate) fn new(reference: DocumentReference, data: Option<DocumentData>) -> Self {
        Self { reference, data }
    }

    pub fn id(&self) -> &str {
        self.reference.id()
    }

    /// Reference to the document this snapshot was read from
    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Document fields, `None` if the document did not exist
    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref()
    }

    /// Read a single field by dot-path
    pub fn get(&self, path: &str) -> Option<&Value> {
        value::resolve(self.data.as_ref()?, path)
    }

    pub fn into_data(self) -> Option<DocumentData> {
        self.data
    }

    /// Deserialize the document into a typed value
    pub fn data_as<T: DeserializeOwned>(&self) -> StoreResult<Option<T>> {
        match &self.data {
            Some(data) => Ok(Some(serde_json::from_value(Value::Object(data.clone()))?)),
            None => Ok(None),
        }
    }
}

/// Ordered documents returned by a query
#[derive(Debug, Clone, Default)]
pub struct QuerySnapshot {
    docs: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub(crate) fn new(docs: Vec<DocumentSnapshot>) -> Self {
        Self { docs }
    }

    pub fn docs(&self) -> &[DocumentSnapshot] {
        &self.docs
    }

    pub fn size(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocumentSnapshot> {
        self.docs.iter()
    }

    pub fn into_docs(self) -> Vec<DocumentSnapshot> {
        self.docs
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}

impl<'a> IntoIterator for &'a QuerySnapshot {
    type Item = &'a DocumentSnapshot;
    type IntoIter = std::slice::Iter<'a, DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.iter()
    }
}
