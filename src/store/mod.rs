//! Document store port.
//!
//! # Data Flow
//! ```text
//! CoreClient / SearchStrategy / ShardingStrategy
//!     → DocumentSource (this trait, the only capability they receive)
//!     → concrete backend (memory.rs in-process, or a remote store adapter)
//! ```
//!
//! # Design Decisions
//! - Strategies hold an `Arc<dyn DocumentSource>`, never a pointer back to the client
//! - The trait is object-safe: futures and streams are boxed
//! - Records are typed (`Record` + `FieldValue`), versioned per collection

pub mod error;
pub mod memory;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;

pub use error::{ErrorCode, ErrorKind, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use types::{
    CollectionKind, Cursor, DocRef, FieldValue, Filter, OrderBy, Query, Record, WriteBatch,
    WriteOp,
};

/// Computes the writes of a transaction from the current state of its read set.
///
/// May be invoked more than once if the transaction is retried.
pub type TransactionFn =
    Arc<dyn Fn(&[Option<Record>]) -> StoreResult<WriteBatch> + Send + Sync>;

/// Minimal capability interface over a remote document store.
pub trait DocumentSource: Send + Sync {
    /// Point read.
    fn get(&self, doc: DocRef) -> BoxFuture<'_, StoreResult<Option<Record>>>;

    /// Create or replace a document.
    fn set(&self, record: Record) -> BoxFuture<'_, StoreResult<()>>;

    /// Merge fields into an existing document. Fails with `not-found` if absent.
    fn update(
        &self,
        doc: DocRef,
        fields: BTreeMap<String, FieldValue>,
    ) -> BoxFuture<'_, StoreResult<()>>;

    /// Remove a document. Removing a missing document is not an error.
    fn delete(&self, doc: DocRef) -> BoxFuture<'_, StoreResult<()>>;

    /// Filtered read.
    fn query(&self, query: Query) -> BoxFuture<'_, StoreResult<Vec<Record>>>;

    /// Continuously produced records for a query.
    fn stream(&self, query: Query) -> BoxStream<'static, StoreResult<Record>>;

    /// Apply a batch atomically.
    fn commit(&self, batch: WriteBatch) -> BoxFuture<'_, StoreResult<()>>;

    /// Read `reads`, compute writes with `apply`, commit atomically.
    fn transact(&self, reads: Vec<DocRef>, apply: TransactionFn) -> BoxFuture<'_, StoreResult<()>>;
}
