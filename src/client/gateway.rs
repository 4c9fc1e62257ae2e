//! The gateway client.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::stream::BoxStream;
use serde::Serialize;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::resilience::{CircuitBreakerStatus, ResilienceResult, ResilienceStrategy};
use crate::search::{SearchStats, SearchStrategy};
use crate::sharding::{ShardingStats, ShardingStrategy};
use crate::store::{
    CollectionKind, Cursor, DocRef, DocumentSource, FieldValue, Filter, Query, Record,
    StoreResult, TransactionFn, WriteBatch,
};

/// Combined observability snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub circuit: CircuitBreakerStatus,
    pub search: SearchStats,
    pub sharding: ShardingStats,
}

/// Uniform, resilient access to a document store.
///
/// Owns one instance of each strategy. Each strategy receives only the
/// `DocumentSource` it needs.
pub struct CoreClient {
    source: Arc<dyn DocumentSource>,
    resilience: ResilienceStrategy,
    search: SearchStrategy,
    sharding: ShardingStrategy,
}

impl CoreClient {
    pub fn new(source: Arc<dyn DocumentSource>, config: &GatewayConfig) -> Self {
        Self {
            resilience: ResilienceStrategy::from_config(&config.resilience),
            search: SearchStrategy::new(source.clone(), &config.search, &config.cache),
            sharding: ShardingStrategy::new(source.clone(), &config.sharding),
            source,
        }
    }

    pub fn source(&self) -> &Arc<dyn DocumentSource> {
        &self.source
    }

    pub fn resilience(&self) -> &ResilienceStrategy {
        &self.resilience
    }

    pub fn search(&self) -> &SearchStrategy {
        &self.search
    }

    pub fn sharding(&self) -> &ShardingStrategy {
        &self.sharding
    }

    /// Run an arbitrary store operation under the retry policy and breaker.
    pub async fn execute_with_retry<T, F, Fut>(&self, name: &str, operation: F) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        self.resilience.execute_with_retry(name, operation).await
    }

    /// Stream variant of [`execute_with_retry`](Self::execute_with_retry).
    pub fn execute_stream_with_retry<T, F>(
        &self,
        name: &str,
        factory: F,
    ) -> BoxStream<'static, ResilienceResult<T>>
    where
        T: Send + 'static,
        F: Fn() -> BoxStream<'static, StoreResult<T>> + Send + 'static,
    {
        self.resilience.execute_stream_with_retry(name, factory)
    }

    pub async fn get(&self, doc: DocRef) -> ResilienceResult<Option<Record>> {
        let name = operation_name(doc.collection, "get");
        self.resilience
            .execute_with_retry(&name, || self.source.get(doc.clone()))
            .await
    }

    /// Create or replace a record.
    pub async fn set(&self, record: Record) -> ResilienceResult<()> {
        let name = operation_name(record.collection, "set");
        self.resilience
            .execute_with_retry(&name, || self.source.set(record.clone()))
            .await
    }

    /// Create a record with a generated id. The id is fixed before the first
    /// attempt so a retried write never creates a second document.
    pub async fn add(
        &self,
        collection: CollectionKind,
        fields: BTreeMap<String, FieldValue>,
    ) -> ResilienceResult<Record> {
        let mut record = Record::new(collection, Uuid::new_v4().to_string());
        record.fields = fields;
        let name = operation_name(collection, "add");
        self.resilience
            .execute_with_retry(&name, || self.source.set(record.clone()))
            .await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        doc: DocRef,
        fields: BTreeMap<String, FieldValue>,
    ) -> ResilienceResult<()> {
        let name = operation_name(doc.collection, "update");
        self.resilience
            .execute_with_retry(&name, || self.source.update(doc.clone(), fields.clone()))
            .await
    }

    pub async fn delete(&self, doc: DocRef) -> ResilienceResult<()> {
        let name = operation_name(doc.collection, "delete");
        self.resilience
            .execute_with_retry(&name, || self.source.delete(doc.clone()))
            .await
    }

    /// Filtered read. A geographic filter routes the query through sharding.
    pub async fn query(&self, query: Query) -> ResilienceResult<Vec<Record>> {
        let name = operation_name(query.collection, "query");
        let query = self.route(query);
        self.resilience
            .execute_with_retry(&name, || self.source.query(query.clone()))
            .await
    }

    /// Continuous read of `collection`, region-scoped when `filters` carry a
    /// geographic dimension.
    pub fn get_optimized(
        &self,
        collection: CollectionKind,
        limit: usize,
        cursor: Option<Cursor>,
        filters: Vec<Filter>,
    ) -> BoxStream<'static, ResilienceResult<Record>> {
        let query = Query::new(collection)
            .filters(filters)
            .limit(limit)
            .start_after(cursor);
        let query = self.route(query);
        let source = self.source.clone();
        self.resilience
            .execute_stream_with_retry(&operation_name(collection, "stream"), move || {
                source.stream(query.clone())
            })
    }

    pub async fn commit_batch(&self, batch: WriteBatch) -> ResilienceResult<()> {
        self.resilience
            .execute_with_retry("batch.commit", || self.source.commit(batch.clone()))
            .await
    }

    /// Read `reads`, compute writes with `apply` and commit atomically.
    /// `apply` runs again on every retry.
    pub async fn run_transaction(
        &self,
        reads: Vec<DocRef>,
        apply: TransactionFn,
    ) -> ResilienceResult<()> {
        self.resilience
            .execute_with_retry("transaction.run", || {
                self.source.transact(reads.clone(), apply.clone())
            })
            .await
    }

    /// Ranked text search. Never fails; see [`SearchStrategy`].
    pub async fn search_enhanced(&self, query: &str, region: Option<&str>, limit: usize) -> Vec<Record> {
        self.search.search(query, region, limit).await
    }

    /// Prefix search over a region and its neighbours.
    pub async fn search_nearby(
        &self,
        query: &str,
        region: Option<&str>,
        limit: usize,
    ) -> ResilienceResult<Vec<Record>> {
        let name = operation_name(self.sharding.config().search_collection, "search_nearby");
        self.resilience
            .execute_with_retry(&name, || {
                self.sharding.search_across_regions(query, region, limit)
            })
            .await
    }

    pub fn circuit_status(&self) -> CircuitBreakerStatus {
        self.resilience.circuit_status()
    }

    pub fn search_stats(&self) -> SearchStats {
        self.search.stats()
    }

    pub fn sharding_stats(&self) -> ShardingStats {
        self.sharding.stats()
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            circuit: self.circuit_status(),
            search: self.search_stats(),
            sharding: self.sharding_stats(),
        }
    }

    pub fn reset_circuit(&self) {
        self.resilience.breaker().reset();
    }

    pub fn clear_search_cache(&self) {
        self.search.clear_cache();
    }

    /// Replace the first geographic filter with its partition scope.
    fn route(&self, mut query: Query) -> Query {
        let region_field = &self.sharding.config().region_field;
        let Some(pos) = query
            .filters
            .iter()
            .position(|f| geographic_code(f, region_field).is_some())
        else {
            return query;
        };
        let filter = query.filters.remove(pos);
        let code = geographic_code(&filter, region_field).map(str::to_string);
        self.sharding.scope(query, code.as_deref())
    }
}

/// Region code carried by `filter`, if it is an equality on `region_field`
/// with a text value.
fn geographic_code<'a>(filter: &'a Filter, region_field: &str) -> Option<&'a str> {
    match filter {
        Filter::Eq { field, value } if field == region_field => value.as_text(),
        _ => None,
    }
}

fn operation_name(collection: CollectionKind, op: &str) -> String {
    format!("{}.{}", collection.as_str(), op)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;

    use super::*;
    use crate::resilience::ResilienceError;
    use crate::store::{ErrorCode, MemoryStore};

    fn job(id: &str, state: &str) -> Record {
        Record::new(CollectionKind::Jobs, id)
            .with_field("title", "Journeyman lineman")
            .with_field("state", state)
    }

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.resilience.initial_delay_ms = 100;
        config.resilience.max_delay_ms = 1000;
        config.resilience.jitter_fraction = 0.0;
        config
    }

    fn setup() -> (Arc<MemoryStore>, CoreClient) {
        let store = Arc::new(MemoryStore::with_records(vec![
            job("j1", "WA"),
            job("j2", "OR"),
            job("j3", "TX"),
            job("j4", "NY"),
        ]));
        let client = CoreClient::new(store.clone(), &config());
        (store, client)
    }

    #[test]
    fn test_geographic_code() {
        assert_eq!(geographic_code(&Filter::eq("state", "WA"), "state"), Some("WA"));
        assert_eq!(geographic_code(&Filter::eq("state", 5i64), "state"), None);
        assert_eq!(geographic_code(&Filter::eq("city", "WA"), "state"), None);
        assert_eq!(geographic_code(&Filter::prefix("state", "W"), "state"), None);
    }

    #[tokio::test]
    async fn test_point_operations() {
        let (_store, client) = setup();
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), FieldValue::from("Apprentice"));
        let created = client.add(CollectionKind::Jobs, fields).await.unwrap();
        assert!(Uuid::parse_str(&created.id).is_ok());

        let doc = created.doc_ref();
        assert_eq!(client.get(doc.clone()).await.unwrap(), Some(created.clone()));

        let mut patch = BTreeMap::new();
        patch.insert("state".to_string(), FieldValue::from("WA"));
        client.update(doc.clone(), patch).await.unwrap();
        let updated = client.get(doc.clone()).await.unwrap().unwrap();
        assert_eq!(updated.text("state"), Some("WA"));

        client.delete(doc.clone()).await.unwrap();
        assert_eq!(client.get(doc).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_keeps_id_across_retries() {
        let (store, client) = setup();
        store.fail_next(ErrorCode::Unavailable, 2);
        let before = store.len();
        let created = client.add(CollectionKind::Jobs, BTreeMap::new()).await.unwrap();
        assert_eq!(store.len(), before + 1);
        assert!(client.get(created.doc_ref()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_missing_is_permanent() {
        let (store, client) = setup();
        store.reset_call_count();
        let err = client
            .update(DocRef::new(CollectionKind::Jobs, "nope"), BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResilienceError::Permanent { .. }));
        assert_eq!(err.operation(), "jobs.update");
        assert_eq!(err.code(), Some(ErrorCode::NotFound));
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn test_query_with_region_routes_through_sharding() {
        let (_store, client) = setup();
        let query = Query::new(CollectionKind::Jobs).filter(Filter::eq("state", "WA"));
        let ids: Vec<_> = client
            .query(query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["j1", "j2"]);
        assert_eq!(client.sharding_stats().regional_query_count, 1);
    }

    #[tokio::test]
    async fn test_query_without_region_is_unpartitioned() {
        let (_store, client) = setup();
        let all = client.query(Query::new(CollectionKind::Jobs)).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(client.sharding_stats().regional_query_count, 0);
        assert_eq!(client.sharding_stats().cross_regional_query_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_region_code_falls_back_to_global() {
        let (_store, client) = setup();
        let query = Query::new(CollectionKind::Jobs).filter(Filter::eq("state", "ZZ"));
        assert_eq!(client.query(query).await.unwrap().len(), 4);
        assert_eq!(client.sharding_stats().cross_regional_query_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_optimized_recovers_from_transient_error() {
        let (store, client) = setup();
        store.fail_next(ErrorCode::Unavailable, 1);
        let records: Vec<_> = client
            .get_optimized(CollectionKind::Jobs, 10, None, vec![Filter::eq("state", "TX")])
            .collect()
            .await;
        let ids: Vec<_> = records.into_iter().map(|r| r.unwrap().id).collect();
        assert_eq!(ids, vec!["j3"]);
    }

    #[tokio::test]
    async fn test_commit_batch_and_transaction() {
        let (store, client) = setup();
        let batch = WriteBatch::new()
            .set(job("j5", "CA"))
            .delete(DocRef::new(CollectionKind::Jobs, "j4"));
        client.commit_batch(batch).await.unwrap();
        assert_eq!(store.len(), 4);

        let apply: TransactionFn = Arc::new(|current: &[Option<Record>]| -> StoreResult<WriteBatch> {
            let mut batch = WriteBatch::new();
            if let Some(Some(record)) = current.first() {
                let mut fields = BTreeMap::new();
                fields.insert("filled".to_string(), FieldValue::from(true));
                batch = batch.update(record.doc_ref(), fields);
            }
            Ok(batch)
        });
        client
            .run_transaction(vec![DocRef::new(CollectionKind::Jobs, "j5")], apply)
            .await
            .unwrap();
        let j5 = client
            .get(DocRef::new(CollectionKind::Jobs, "j5"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(j5.get("filled"), Some(&FieldValue::Bool(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_status_and_reset() {
        let (store, client) = setup();
        store.fail_next(ErrorCode::PermissionDenied, 5);
        for _ in 0..5 {
            let _ = client.get(DocRef::new(CollectionKind::Jobs, "j1")).await;
        }
        let status = client.circuit_status();
        assert!(status.is_open);
        assert_eq!(status.time_until_reset, Duration::from_secs(60));

        client.reset_circuit();
        assert!(!client.circuit_status().is_open);
        assert!(client.get(DocRef::new(CollectionKind::Jobs, "j1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_search_nearby_and_stats() {
        let store = Arc::new(MemoryStore::with_records(vec![
            Record::new(CollectionKind::Locals, "l1")
                .with_field("name", "Local 46")
                .with_field("state", "WA"),
            Record::new(CollectionKind::Locals, "l2")
                .with_field("name", "Local 77")
                .with_field("state", "TX"),
        ]));
        let client = CoreClient::new(store, &config());

        let nearby = client.search_nearby("local", Some("WA"), 10).await.unwrap();
        assert_eq!(nearby.len(), 2);
        assert_eq!(nearby[0].id, "l1");

        assert_eq!(client.search_enhanced("local", Some("TX"), 10).await.len(), 1);
        let stats = client.stats();
        assert_eq!(stats.search.total_searches, 1);
        assert_eq!(stats.sharding.cross_regional_query_count, 1);
        assert!(!stats.circuit.is_open);
    }
}
