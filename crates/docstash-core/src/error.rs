//! Store error handling
//!
//! Provides typed errors for document, query and batch operations.
//! Reads never fail on missing data: absent documents and never-written
//! collections are reported through snapshots, not errors.

use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// `update`/`patch` against a document that does not exist
    #[error("No document to update: '{path}'")]
    NotFound { path: String },

    /// Written data is not a JSON object
    #[error("Invalid document data: {0}")]
    InvalidData(String),

    /// Filter operator spelling is not recognized
    #[error("Unsupported filter operator '{0}'")]
    UnsupportedOperator(String),

    /// A caller-supplied argument is not acceptable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Batch holds more writes than the store accepts in one commit
    #[error("Batch contains {size} writes, the limit is {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    /// A batched write failed; writes before `index` were applied
    /// unless the batch was committed atomically
    #[error("Batch write #{index} failed: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<StoreError>,
    },

    /// Value could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if this error (or the batch write that caused it) is a missing document
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Batch { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Number of batched writes applied before a non-atomic commit stopped
    ///
    /// Returns `None` for errors that did not come from a batch commit.
    pub fn applied_writes(&self) -> Option<usize> {
        match self {
            StoreError::Batch { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn not_an_object(what: &str) -> Self {
        StoreError::InvalidData(format!("{} must be a JSON object", what))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
