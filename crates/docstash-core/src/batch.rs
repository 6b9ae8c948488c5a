//! Batched writes
//!
//! A `WriteBatch` queues writes against any number of documents and applies
//! them in enqueue order when committed. Nothing touches the store before
//! commit.
//!
//! Two commit modes are available:
//!
//! - [`WriteBatch::commit`] applies writes one at a time and stops at the
//!   first failure. Writes before the failing one stay applied; there is no
//!   rollback.
//! - [`WriteBatch::commit_atomic`] applies every write to staged copies under
//!   a single write lock and publishes them only if all succeed.

use serde::Serialize;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::patch::Patch;
use crate::reference::{to_document, DocumentReference};
use crate::store::{Store, Write};

/// Ordered queue of deferred writes
#[derive(Debug)]
pub struct WriteBatch {
    store: Store,
    writes: Vec<(DocumentReference, Write)>,
}

impl WriteBatch {
    pub(crate) fn new(store: Store) -> Self {
        Self {
            store,
            writes: Vec::new(),
        }
    }

    /// Queue a full replace of `doc`
    ///
    /// `data` is copied now; later changes to it do not affect the batch.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        doc: &DocumentReference,
        data: &T,
    ) -> StoreResult<&mut Self> {
        let data = to_document(data)?;
        Ok(self.push(doc, Write::Set(data)))
    }

    /// Queue a deep merge into `doc`
    pub fn set_merge<T: Serialize + ?Sized>(
        &mut self,
        doc: &DocumentReference,
        data: &T,
    ) -> StoreResult<&mut Self> {
        let data = to_document(data)?;
        Ok(self.push(doc, Write::Merge(data)))
    }

    /// Queue a dot-path update of an existing document
    pub fn update<T: Serialize + ?Sized>(
        &mut self,
        doc: &DocumentReference,
        partial: &T,
    ) -> StoreResult<&mut Self> {
        let patch = Patch::from_value(serde_json::to_value(partial)?)?;
        Ok(self.push(doc, Write::Patch(patch)))
    }

    /// Queue field changes on an existing document
    pub fn patch(&mut self, doc: &DocumentReference, patch: Patch) -> &mut Self {
        self.push(doc, Write::Patch(patch))
    }

    /// Queue removal of `doc`
    pub fn delete(&mut self, doc: &DocumentReference) -> &mut Self {
        self.push(doc, Write::Delete)
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Apply queued writes in order, stopping at the first failure
    ///
    /// Not atomic: on `StoreError::Batch { index, .. }` the writes before
    /// `index` have been applied and remain so.
    pub async fn commit(self) -> StoreResult<()> {
        self.validate()?;
        debug!("Committing batch of {} writes", self.writes.len());

        for (index, (doc, write)) in self.writes.into_iter().enumerate() {
            doc.apply(write).await.map_err(|source| StoreError::Batch {
                index,
                source: Box::new(source),
            })?;
        }

        Ok(())
    }

    /// Apply all queued writes or none of them
    pub async fn commit_atomic(self) -> StoreResult<()> {
        self.validate()?;
        debug!("Committing atomic batch of {} writes", self.writes.len());

        let mut live = self.store.write().await;
        let mut staged = live.stage(self.writes.iter().map(|(doc, _)| doc.collection_path()));

        for (index, (doc, write)) in self.writes.into_iter().enumerate() {
            staged
                .apply(doc.collection_path(), doc.id(), write)
                .map_err(|source| {
                    debug!("Atomic batch aborted at write #{}", index);
                    StoreError::Batch {
                        index,
                        source: Box::new(source),
                    }
                })?;
        }

        live.publish(staged);
        Ok(())
    }

    fn push(&mut self, doc: &DocumentReference, write: Write) -> &mut Self {
        self.writes.push((doc.clone(), write));
        self
    }

    fn validate(&self) -> StoreResult<()> {
        let limit = self.store.config().max_batch_writes;
        if self.writes.len() > limit {
            return Err(StoreError::BatchTooLarge {
                size: self.writes.len(),
                limit,
            });
        }

        if let Some((doc, _)) = self
            .writes
            .iter()
            .find(|(doc, _)| !doc.store().same_store(&self.store))
        {
            return Err(StoreError::InvalidArgument(format!(
                "document '{}' belongs to a different store",
                doc.path()
            )));
        }

        for (doc, _) in &self.writes {
            doc.check_id()?;
        }

        Ok(())
    }
}
