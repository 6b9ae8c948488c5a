//! docstash Core Library
//!
//! An in-memory document store with an embedded query engine. It mirrors
//! the client surface of a hierarchical collection/document database so an
//! application can run against local memory when no real database is
//! configured.
//!
//! # Architecture
//!
//! - **Store**: owns every collection bucket behind an async `RwLock`
//! - **References**: `(store, path)` addresses for documents and collections
//! - **Query**: immutable builder, executed as filter -> sort -> offset -> limit
//! - **Batch**: ordered deferred writes, committed sequentially or atomically
//!
//! Every read returns owned copies and every write copies its input, so
//! callers can never reach stored data through a value they hold.
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::new();
//! let users = store.collection("users");
//!
//! users.doc("u1").set(&json!({"name": "Ann", "usage": {"credits": 5}})).await?;
//! users.doc("u1").update(&json!({"usage.credits": 6})).await?;
//!
//! let heavy = users
//!     .where_field("usage.credits", FilterOp::GreaterThanOrEqual, 6)
//!     .get()
//!     .await;
//! ```
//!
//! # Modules
//!
//! - `store`: Store handle and bucket storage (main entry point)
//! - `reference`: Document and collection references
//! - `query`: Filters, ordering, pagination and count aggregation
//! - `snapshot`: Document and query read results
//! - `batch`: Write batches
//! - `patch`: Dot-path field changes and transforms
//! - `value`: Dot-path access and value comparison
//! - `config`: Store configuration

pub mod batch;
pub mod config;
pub mod error;
pub mod patch;
pub mod query;
pub mod reference;
pub mod snapshot;
pub mod store;
pub mod value;

pub use batch::WriteBatch;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use patch::{FieldChange, Patch};
pub use query::{
    AggregateData, AggregateQuery, AggregateQuerySnapshot, Direction, Filter, FilterOp, OrderBy,
    Query,
};
pub use reference::{CollectionReference, DocumentReference};
pub use snapshot::{DocumentSnapshot, QuerySnapshot};
pub use store::Store;
pub use value::DocumentData;
