//! Document and collection references
//!
//! References are addresses, not data: a `(store, collection path, id)`
//! triple for documents and a query with no clauses for collections.
//! They are cheap to clone and create per operation.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::trace;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::patch::Patch;
use crate::query::{AggregateQuery, Direction, FilterOp, Query};
use crate::snapshot::{DocumentSnapshot, QuerySnapshot};
use crate::store::{Store, Write};
use crate::value::{self, DocumentData};

/// Serialize caller data into an owned document
pub(crate) fn to_document<T: Serialize + ?Sized>(data: &T) -> StoreResult<DocumentData> {
    value::into_object(serde_json::to_value(data)?)
        .ok_or_else(|| StoreError::not_an_object("document data"))
}

/// Generate a random document id
///
/// Base58 of a v4 UUID: alphanumeric, around 22 characters.
pub fn auto_id() -> String {
    bs58::encode(Uuid::new_v4().as_bytes()).into_string()
}

/// Address of a single document
#[derive(Clone)]
pub struct DocumentReference {
    store: Store,
    collection_path: String,
    id: String,
}

impl fmt::Debug for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentReference")
            .field("path", &self.path())
            .finish()
    }
}

impl PartialEq for DocumentReference {
    fn eq(&self, other: &Self) -> bool {
        self.store.same_store(&other.store)
            && self.collection_path == other.collection_path
            && self.id == other.id
    }
}

impl DocumentReference {
    pub(crate) fn new(store: Store, collection_path: String, id: String) -> Self {
        Self {
            store,
            collection_path,
            id,
        }
    }

    /// The document id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full slash-separated path, e.g. `users/u1`
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection_path, self.id)
    }

    /// The collection this document belongs to
    pub fn parent(&self) -> CollectionReference {
        CollectionReference::new(self.store.clone(), self.collection_path.clone())
    }

    /// Reference a sub-collection rooted at this document
    pub fn collection(&self, name: impl AsRef<str>) -> CollectionReference {
        CollectionReference::new(
            self.store.clone(),
            format!("{}/{}/{}", self.collection_path, self.id, name.as_ref()),
        )
    }

    /// Read the document
    ///
    /// A missing document yields a snapshot with `exists() == false`.
    pub async fn get(&self) -> DocumentSnapshot {
        let collections = self.store.read().await;
        let data = collections
            .document(&self.collection_path, &self.id)
            .cloned();
        trace!("Read {} (exists={})", self.path(), data.is_some());
        DocumentSnapshot::new(self.clone(), data)
    }

    /// Replace the whole document, creating it if absent
    pub async fn set<T: Serialize + ?Sized>(&self, data: &T) -> StoreResult<()> {
        let data = to_document(data)?;
        self.apply(Write::Set(data)).await
    }

    /// Deep-merge `data` into the document, creating it if absent
    pub async fn set_merge<T: Serialize + ?Sized>(&self, data: &T) -> StoreResult<()> {
        let data = to_document(data)?;
        self.apply(Write::Merge(data)).await
    }

    /// Merge a partial object into an existing document
    ///
    /// Keys may be dot-paths; `{"usage.credits": 6}` changes only that leaf.
    /// Fails with `NotFound` if the document does not exist.
    pub async fn update<T: Serialize + ?Sized>(&self, partial: &T) -> StoreResult<()> {
        let patch = Patch::from_value(serde_json::to_value(partial)?)?;
        self.apply(Write::Patch(patch)).await
    }

    /// Apply field changes to an existing document under one write lock
    pub async fn patch(&self, patch: Patch) -> StoreResult<()> {
        self.apply(Write::Patch(patch)).await
    }

    /// Remove the document; absent documents are ignored
    ///
    /// Sub-collections under this document are left in place.
    pub async fn delete(&self) -> StoreResult<()> {
        self.apply(Write::Delete).await
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn collection_path(&self) -> &str {
        &self.collection_path
    }

    /// Ids name a single path segment
    pub(crate) fn check_id(&self) -> StoreResult<()> {
        if self.id.is_empty() || self.id.contains('/') {
            return Err(StoreError::InvalidArgument(format!(
                "invalid document id '{}' in '{}': ids must be non-empty and contain no '/'",
                self.id, self.collection_path
            )));
        }
        Ok(())
    }

    pub(crate) async fn apply(&self, write: Write) -> StoreResult<()> {
        self.check_id()?;
        let mut collections = self.store.write().await;
        collections.apply(&self.collection_path, &self.id, write)
    }
}

/// Address of a collection; also usable directly as a query
#[derive(Debug, Clone)]
pub struct CollectionReference {
    query: Query,
}

impl CollectionReference {
    pub(crate) fn new(store: Store, path: String) -> Self {
        Self {
            query: Query::new(store, path),
        }
    }

    /// Last segment of the collection path
    pub fn id(&self) -> &str {
        let path = self.path();
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Full collection path, e.g. `users/u1/cvs`
    pub fn path(&self) -> &str {
        self.query.path()
    }

    /// The document owning this sub-collection, `None` at the top level
    pub fn parent(&self) -> Option<DocumentReference> {
        let (owner, _) = self.path().rsplit_once('/')?;
        let (collection_path, id) = owner.rsplit_once('/')?;
        Some(DocumentReference::new(
            self.query.store().clone(),
            collection_path.to_string(),
            id.to_string(),
        ))
    }

    /// Reference a document by id
    ///
    /// Sub-collection documents are reached through
    /// [`DocumentReference::collection`]; an id that is empty or contains
    /// `/` never matches a stored document and every write through it fails
    /// with `StoreError::InvalidArgument`.
    pub fn doc(&self, id: impl Into<String>) -> DocumentReference {
        DocumentReference::new(
            self.query.store().clone(),
            self.path().to_string(),
            id.into(),
        )
    }

    /// Reference a document with a freshly generated id
    pub fn new_doc(&self) -> DocumentReference {
        self.doc(auto_id())
    }

    /// Store `data` under a generated id and return its reference
    pub async fn add<T: Serialize + ?Sized>(&self, data: &T) -> StoreResult<DocumentReference> {
        let doc = self.new_doc();
        doc.set(data).await?;
        Ok(doc)
    }

    /// This collection as a query with no clauses
    pub fn query(&self) -> Query {
        self.query.clone()
    }

    pub fn where_field(
        &self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Query {
        self.query.where_field(field, op, value)
    }

    pub fn where_op(
        &self,
        field: impl Into<String>,
        op: &str,
        value: impl Into<Value>,
    ) -> StoreResult<Query> {
        self.query.where_op(field, op, value)
    }

    pub fn order_by(&self, field: impl Into<String>, direction: Direction) -> Query {
        self.query.order_by(field, direction)
    }

    pub fn limit(&self, count: usize) -> Query {
        self.query.limit(count)
    }

    pub fn offset(&self, count: usize) -> Query {
        self.query.offset(count)
    }

    /// Read every document in the collection
    pub async fn get(&self) -> QuerySnapshot {
        self.query.get().await
    }

    pub fn count(&self) -> AggregateQuery {
        self.query.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_document() {
        let store = Store::new();
        let snapshot = store.collection("users").doc("nobody").get().await;

        assert!(!snapshot.exists());
        assert!(snapshot.data().is_none());
        assert_eq!(snapshot.id(), "nobody");
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = Store::new();
        let doc = store.collection("users").doc("u1");
        doc.set(&json!({"name": "Ann", "age": 31})).await.unwrap();

        let snapshot = doc.get().await;
        assert!(snapshot.exists());
        assert_eq!(snapshot.get("name"), Some(&json!("Ann")));
        assert_eq!(snapshot.get("age"), Some(&json!(31)));
    }

    #[tokio::test]
    async fn test_set_replaces_whole_document() {
        let store = Store::new();
        let doc = store.collection("users").doc("u1");
        doc.set(&json!({"a": 1, "b": 2})).await.unwrap();
        doc.set(&json!({"c": 3})).await.unwrap();

        assert_eq!(
            doc.get().await.into_data().map(Value::Object),
            Some(json!({"c": 3}))
        );
    }

    #[tokio::test]
    async fn test_set_rejects_non_object() {
        let store = Store::new();
        let err = store
            .collection("users")
            .doc("u1")
            .set(&json!("just a string"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_set_typed_struct() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Profile {
            name: String,
            credits: u32,
        }

        let store = Store::new();
        let doc = store.collection("users").doc("u1");
        let profile = Profile {
            name: "Ann".to_string(),
            credits: 5,
        };
        doc.set(&profile).await.unwrap();

        let loaded: Option<Profile> = doc.get().await.data_as().unwrap();
        assert_eq!(loaded, Some(profile));
    }

    #[tokio::test]
    async fn test_set_merge() {
        let store = Store::new();
        let doc = store.collection("users").doc("u1");
        doc.set_merge(&json!({"profile": {"name": "Ann"}}))
            .await
            .unwrap();
        doc.set_merge(&json!({"profile": {"title": "Dev"}, "plan": "free"}))
            .await
            .unwrap();

        assert_eq!(
            doc.get().await.into_data().map(Value::Object),
            Some(json!({"profile": {"name": "Ann", "title": "Dev"}, "plan": "free"}))
        );
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let store = Store::new();
        let err = store
            .collection("users")
            .doc("ghost")
            .update(&json!({"a": 1}))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(!store.collection("users").doc("ghost").get().await.exists());
    }

    #[tokio::test]
    async fn test_update_merges_dot_paths() {
        let store = Store::new();
        let doc = store.collection("users").doc("u1");
        doc.set(&json!({"a": 1, "b": {"c": 2, "d": 4}})).await.unwrap();
        doc.update(&json!({"b.c": 3, "e.f": true})).await.unwrap();

        assert_eq!(
            doc.get().await.into_data().map(Value::Object),
            Some(json!({"a": 1, "b": {"c": 3, "d": 4}, "e": {"f": true}}))
        );
    }

    #[tokio::test]
    async fn test_patch_increment_is_not_lost() {
        let store = Store::new();
        let doc = store.collection("users").doc("u1");
        doc.set(&json!({"usage": {"credits": 0}})).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let doc = doc.clone();
            tasks.push(tokio::spawn(async move {
                doc.patch(Patch::new().increment("usage.credits", 1)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(doc.get().await.get("usage.credits"), Some(&json!(50)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = Store::new();
        let doc = store.collection("users").doc("u1");
        doc.set(&json!({"a": 1})).await.unwrap();

        doc.delete().await.unwrap();
        doc.delete().await.unwrap();
        assert!(!doc.get().await.exists());
    }

    #[tokio::test]
    async fn test_delete_keeps_sub_collections() {
        let store = Store::new();
        let user = store.collection("users").doc("u1");
        user.set(&json!({"name": "Ann"})).await.unwrap();
        user.collection("cvs")
            .doc("cv1")
            .set(&json!({"title": "Main"}))
            .await
            .unwrap();

        user.delete().await.unwrap();

        assert!(!user.get().await.exists());
        assert!(user.collection("cvs").doc("cv1").get().await.exists());
    }

    #[tokio::test]
    async fn test_sub_collection_paths() {
        let store = Store::new();
        let cvs = store.collection("users").doc("u1").collection("cvs");

        assert_eq!(cvs.path(), "users/u1/cvs");
        assert_eq!(cvs.id(), "cvs");

        let cv = cvs.doc("cv1");
        assert_eq!(cv.path(), "users/u1/cvs/cv1");
        assert_eq!(cv.parent().path(), "users/u1/cvs");

        let owner = cvs.parent().unwrap();
        assert_eq!(owner.path(), "users/u1");
        assert!(store.collection("users").parent().is_none());
    }

    #[tokio::test]
    async fn test_sub_collections_are_separate_buckets() {
        let store = Store::new();
        let users = store.collection("users");
        users.doc("u1").set(&json!({"n": 1})).await.unwrap();
        users
            .doc("u1")
            .collection("cvs")
            .doc("cv1")
            .set(&json!({"n": 2}))
            .await
            .unwrap();

        assert_eq!(users.get().await.size(), 1);
        assert_eq!(users.doc("u1").collection("cvs").get().await.size(), 1);
        assert_eq!(users.doc("u2").collection("cvs").get().await.size(), 0);
    }

    #[tokio::test]
    async fn test_slash_in_id_is_rejected() {
        let store = Store::new();
        let users = store.collection("users");
        let nested = users.doc("u1").collection("cvs").doc("cv1");
        let flattened = users.doc("u1/cvs/cv1");

        nested.set(&json!({"title": "Main"})).await.unwrap();

        let err = flattened.set(&json!({"title": "Other"})).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        let err = users.doc("").update(&json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));

        assert!(!flattened.get().await.exists());
        assert_eq!(nested.get().await.get("title"), Some(&json!("Main")));
        assert!(users.get().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_generates_ids() {
        let store = Store::new();
        let tickets = store.collection("tickets");

        let first = tickets.add(&json!({"subject": "a"})).await.unwrap();
        let second = tickets.add(&json!({"subject": "b"})).await.unwrap();

        assert_ne!(first.id(), second.id());
        assert!(first.id().chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(first.get().await.exists());
        assert_eq!(tickets.get().await.size(), 2);
    }

    #[test]
    fn test_reference_equality() {
        let store = Store::new();
        let a = store.collection("users").doc("u1");

        assert_eq!(a, store.collection("users").doc("u1"));
        assert_ne!(a, store.collection("users").doc("u2"));
        assert_ne!(a, Store::new().collection("users").doc("u1"));
        assert!(format!("{:?}", a).contains("users/u1"));
    }
}
