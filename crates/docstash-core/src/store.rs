//! In-memory document store
//!
//! The `Store` owns every collection bucket. Buckets are flat: a
//! sub-collection is just another bucket whose path is
//! `{parentCollection}/{parentId}/{name}`.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::new();
//! let users = store.collection("users");
//!
//! users.doc("u1").set(&json!({"name": "Ann"})).await?;
//! let snapshot = users.doc("u1").get().await;
//! ```
//!
//! `Store` is a cheap handle; clones share the same data. Every read hands
//! out owned copies, so the only way to change stored data is through the
//! write operations on references and batches.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

use crate::batch::WriteBatch;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::patch::Patch;
use crate::reference::CollectionReference;
use crate::value::{self, DocumentData};

/// Documents of one collection, keyed by id
pub(crate) type Bucket = BTreeMap<String, DocumentData>;

/// A write bound to one document, applied by references and batches
#[derive(Debug, Clone)]
pub(crate) enum Write {
    /// Replace the whole document
    Set(DocumentData),
    /// Deep-merge into the document, creating it if absent
    Merge(DocumentData),
    /// Apply field changes to an existing document
    Patch(Patch),
    /// Remove the document if present
    Delete,
}

impl Write {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Write::Set(_) => "set",
            Write::Merge(_) => "merge",
            Write::Patch(_) => "patch",
            Write::Delete => "delete",
        }
    }
}

/// All buckets, keyed by collection path
#[derive(Debug, Default)]
pub(crate) struct Collections {
    buckets: BTreeMap<String, Bucket>,
}

impl Collections {
    pub(crate) fn bucket(&self, path: &str) -> Option<&Bucket> {
        self.buckets.get(path)
    }

    pub(crate) fn document(&self, path: &str, id: &str) -> Option<&DocumentData> {
        self.buckets.get(path)?.get(id)
    }

    /// Apply one write to the document `(path, id)`
    pub(crate) fn apply(&mut self, path: &str, id: &str, write: Write) -> StoreResult<()> {
        trace!("Applying {} to {}/{}", write.kind(), path, id);

        match write {
            Write::Set(data) => {
                self.buckets
                    .entry(path.to_string())
                    .or_default()
                    .insert(id.to_string(), data);
            }
            Write::Merge(data) => {
                let existing = self
                    .buckets
                    .entry(path.to_string())
                    .or_default()
                    .entry(id.to_string())
                    .or_default();
                value::merge_into(existing, data);
            }
            Write::Patch(patch) => {
                let existing = self
                    .buckets
                    .get_mut(path)
                    .and_then(|bucket| bucket.get_mut(id))
                    .ok_or_else(|| StoreError::NotFound {
                        path: format!("{}/{}", path, id),
                    })?;
                let mut updated = existing.clone();
                patch.apply_to(&mut updated)?;
                *existing = updated;
            }
            Write::Delete => {
                if let Some(bucket) = self.buckets.get_mut(path) {
                    bucket.remove(id);
                }
            }
        }

        Ok(())
    }

    /// Copy the buckets at `paths` into a scratch set of collections
    pub(crate) fn stage<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Collections {
        let mut staged = Collections::default();
        for path in paths {
            if let Some(bucket) = self.buckets.get(path) {
                staged.buckets.insert(path.to_string(), bucket.clone());
            }
        }
        staged
    }

    /// Replace buckets with their staged versions
    pub(crate) fn publish(&mut self, staged: Collections) {
        self.buckets.extend(staged.buckets);
    }
}

#[derive(Debug)]
struct StoreInner {
    collections: RwLock<Collections>,
    config: StoreConfig,
}

/// Root owner of all collections and documents
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with a specific configuration
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                collections: RwLock::new(Collections::default()),
                config,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Reference a top-level collection
    ///
    /// Never fails; the bucket is created by the first write.
    pub fn collection(&self, name: impl Into<String>) -> CollectionReference {
        CollectionReference::new(self.clone(), name.into())
    }

    /// Start an empty write batch bound to this store
    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new(self.clone())
    }

    /// Check whether two handles share the same data
    pub fn same_store(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Collections> {
        self.inner.collections.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Collections> {
        self.inner.collections.write().await
    }
}
