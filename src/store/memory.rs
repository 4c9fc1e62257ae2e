//! In-process document source.
//!
//! Used by tests and the command-line tool. Supports fault injection so the
//! resilience layer can be exercised without a network.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::store::error::{ErrorCode, StoreError, StoreResult};
use crate::store::types::{DocRef, FieldValue, Query, Record, WriteBatch, WriteOp};
use crate::store::{DocumentSource, TransactionFn};

/// A thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<DocRef, Record>>,
    faults: Mutex<VecDeque<StoreError>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `records`.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        store.insert_all(records);
        store
    }

    /// Seed records directly, bypassing faults and call counting.
    pub fn insert_all(&self, records: impl IntoIterator<Item = Record>) {
        let mut docs = self.docs.write().expect("memory store lock poisoned");
        for record in records {
            docs.insert(record.doc_ref(), record);
        }
    }

    /// Make the next `times` operations fail with `code`.
    pub fn fail_next(&self, code: ErrorCode, times: usize) {
        let mut faults = self.faults.lock().expect("memory store fault lock poisoned");
        for _ in 0..times {
            faults.push_back(StoreError::new(code, "injected fault"));
        }
    }

    /// Drop any pending injected faults.
    pub fn clear_faults(&self) {
        self.faults.lock().expect("memory store fault lock poisoned").clear();
    }

    /// Number of operations attempted against the store.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_call_count(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.docs.read().expect("memory store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count the call and surface the next injected fault, if any.
    fn begin(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fault = self
            .faults
            .lock()
            .expect("memory store fault lock poisoned")
            .pop_front();
        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn run_query(&self, query: &Query) -> StoreResult<Vec<Record>> {
        let docs = self.docs.read().expect("memory store lock poisoned");
        let mut matched: Vec<Record> = docs
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));

        if let Some(cursor) = &query.start_after {
            let pos = matched
                .iter()
                .position(|r| r.id == cursor.after_id)
                .ok_or_else(|| {
                    StoreError::new(
                        ErrorCode::InvalidArgument,
                        format!("cursor '{}' is not in the result set", cursor.after_id),
                    )
                })?;
            matched.drain(..=pos);
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

fn check_schema(record: &Record) -> StoreResult<()> {
    let current = record.collection.schema_version();
    if record.schema_version > current {
        return Err(StoreError::new(
            ErrorCode::FailedPrecondition,
            format!(
                "{} schema version {} is newer than supported version {}",
                record.collection, record.schema_version, current
            ),
        ));
    }
    Ok(())
}

fn merge_fields(
    docs: &mut BTreeMap<DocRef, Record>,
    doc: &DocRef,
    fields: BTreeMap<String, FieldValue>,
) -> StoreResult<()> {
    let record = docs
        .get_mut(doc)
        .ok_or_else(|| StoreError::not_found(format!("{}/{}", doc.collection, doc.id)))?;
    record.fields.extend(fields);
    Ok(())
}

/// Apply every op to a staged copy; the live map only changes if all succeed.
fn apply_batch(docs: &mut BTreeMap<DocRef, Record>, batch: WriteBatch) -> StoreResult<()> {
    let mut staged = docs.clone();
    for op in batch.ops {
        match op {
            WriteOp::Set(record) => {
                check_schema(&record)?;
                staged.insert(record.doc_ref(), record);
            }
            WriteOp::Update { doc, fields } => merge_fields(&mut staged, &doc, fields)?,
            WriteOp::Delete(doc) => {
                staged.remove(&doc);
            }
        }
    }
    *docs = staged;
    Ok(())
}

impl DocumentSource for MemoryStore {
    fn get(&self, doc: DocRef) -> BoxFuture<'_, StoreResult<Option<Record>>> {
        Box::pin(async move {
            self.begin()?;
            let docs = self.docs.read().expect("memory store lock poisoned");
            Ok(docs.get(&doc).cloned())
        })
    }

    fn set(&self, record: Record) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.begin()?;
            check_schema(&record)?;
            let mut docs = self.docs.write().expect("memory store lock poisoned");
            docs.insert(record.doc_ref(), record);
            Ok(())
        })
    }

    fn update(
        &self,
        doc: DocRef,
        fields: BTreeMap<String, FieldValue>,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.begin()?;
            let mut docs = self.docs.write().expect("memory store lock poisoned");
            merge_fields(&mut docs, &doc, fields)
        })
    }

    fn delete(&self, doc: DocRef) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.begin()?;
            let mut docs = self.docs.write().expect("memory store lock poisoned");
            docs.remove(&doc);
            Ok(())
        })
    }

    fn query(&self, query: Query) -> BoxFuture<'_, StoreResult<Vec<Record>>> {
        Box::pin(async move {
            self.begin()?;
            self.run_query(&query)
        })
    }

    fn stream(&self, query: Query) -> BoxStream<'static, StoreResult<Record>> {
        let snapshot = self.begin().and_then(|_| self.run_query(&query));
        match snapshot {
            Ok(records) => stream::iter(records.into_iter().map(Ok)).boxed(),
            Err(err) => stream::once(async move { Err(err) }).boxed(),
        }
    }

    fn commit(&self, batch: WriteBatch) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.begin()?;
            let mut docs = self.docs.write().expect("memory store lock poisoned");
            apply_batch(&mut docs, batch)
        })
    }

    fn transact(&self, reads: Vec<DocRef>, apply: TransactionFn) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.begin()?;
            let mut docs = self.docs.write().expect("memory store lock poisoned");
            let current: Vec<Option<Record>> = reads.iter().map(|d| docs.get(d).cloned()).collect();
            let batch = apply(&current)?;
            apply_batch(&mut docs, batch)
        })
    }
}
