//! Ranked, cached text search over one collection.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::time::Instant;

use crate::cache::TtlCache;
use crate::config::{CacheConfig, SearchConfig};
use crate::observability::metrics;
use crate::store::{DocumentSource, FieldValue, Filter, Query, Record, StoreResult};

use super::query::{SearchMode, SearchQuery};
use super::scoring::{ScoredRecord, Scorer};
use super::stats::{SearchMetric, SearchMetricsLog, SearchStats};

type CachedResult = Arc<Vec<ScoredRecord>>;

/// Multi-field relevance search with a TTL result cache and a basic-mode
/// fallback. Never returns an error: backend failures degrade to fewer or no
/// results and are recorded in the metric log.
pub struct SearchStrategy {
    source: Arc<dyn DocumentSource>,
    config: SearchConfig,
    scorer: Scorer,
    cache: TtlCache<CachedResult>,
    log: SearchMetricsLog,
}

impl SearchStrategy {
    pub fn new(source: Arc<dyn DocumentSource>, config: &SearchConfig, cache: &CacheConfig) -> Self {
        Self {
            source,
            scorer: Scorer::from_config(config),
            cache: TtlCache::new("search", cache.ttl(), cache.max_entries),
            log: SearchMetricsLog::new(config.metrics_capacity),
            config: config.clone(),
        }
    }

    /// Ranked records for `query`, best first, at most `limit` of them.
    pub async fn search(&self, query: &str, region: Option<&str>, limit: usize) -> Vec<Record> {
        self.search_scored(query, region, limit)
            .await
            .into_iter()
            .map(|scored| scored.record)
            .collect()
    }

    /// Like [`search`](Self::search) but keeps the relevance scores.
    pub async fn search_scored(
        &self,
        query: &str,
        region: Option<&str>,
        limit: usize,
    ) -> Vec<ScoredRecord> {
        let query = SearchQuery::new(query, region, limit);
        if query.len() < self.config.min_query_length || limit == 0 {
            return Vec::new();
        }

        let start = Instant::now();
        let key = query.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(key = %key, results = cached.len(), "Search cache hit");
            self.record(&query, None, cached.len(), start, None);
            return cached.as_ref().clone();
        }

        let terms = query.terms(self.config.min_term_length, self.config.max_terms);
        let mode = match query.mode(self.config.advanced_min_length) {
            SearchMode::Advanced if !terms.is_empty() => SearchMode::Advanced,
            _ => SearchMode::Basic,
        };

        let (outcome, used) = match mode {
            SearchMode::Advanced => match self.advanced(&query, &terms).await {
                Ok(ranked) => (Ok(ranked), SearchMode::Advanced),
                Err(err) => {
                    tracing::warn!(
                        query = %query.text,
                        error = %err,
                        "Advanced search failed, falling back to basic search"
                    );
                    metrics::record_search_fallback();
                    (self.basic(&query).await, SearchMode::Basic)
                }
            },
            SearchMode::Basic => (self.basic(&query).await, SearchMode::Basic),
        };

        match outcome {
            Ok(ranked) => {
                self.cache.insert(key, Arc::new(ranked.clone()));
                self.record(&query, Some(used), ranked.len(), start, None);
                ranked
            }
            Err(err) => {
                tracing::warn!(query = %query.text, error = %err, "Search failed, returning no results");
                self.record(&query, Some(used), 0, start, Some(err.to_string()));
                Vec::new()
            }
        }
    }

    /// Candidates from every weighted field, scored across all fields.
    async fn advanced(&self, query: &SearchQuery, terms: &[String]) -> StoreResult<Vec<ScoredRecord>> {
        let mut candidates: BTreeMap<String, Record> = BTreeMap::new();
        for field in self.scorer.fields() {
            let filters: Vec<Filter> = if field.array {
                vec![Filter::ArrayContainsAny {
                    field: field.field.clone(),
                    values: terms.iter().map(|t| FieldValue::from(t.as_str())).collect(),
                }]
            } else {
                terms.iter().map(|t| Filter::prefix(field.field.clone(), t.clone())).collect()
            };
            for filter in filters {
                let found = self.source.query(self.candidate_query(query, filter)).await?;
                for record in found {
                    candidates.entry(record.id.clone()).or_insert(record);
                }
            }
        }
        tracing::debug!(
            query = %query.text,
            candidates = candidates.len(),
            "Scoring advanced search candidates"
        );
        Ok(self.scorer.rank(candidates.into_values(), terms, query.limit))
    }

    /// Prefix match on the primary field, scored with the whole query as one term.
    async fn basic(&self, query: &SearchQuery) -> StoreResult<Vec<ScoredRecord>> {
        let filter = Filter::prefix(self.config.primary_field.clone(), query.text.clone());
        let found = self
            .source
            .query(self.candidate_query(query, filter).order_by(self.config.primary_field.clone(), false))
            .await?;
        Ok(self.scorer.rank(found, std::slice::from_ref(&query.text), query.limit))
    }

    fn candidate_query(&self, query: &SearchQuery, filter: Filter) -> Query {
        let mut q = Query::new(self.config.collection)
            .filter(filter)
            .limit(self.config.candidate_limit.max(query.limit));
        if let Some(region) = &query.region_filter {
            q = q.filter(Filter::eq(self.config.region_field.clone(), region.as_str()));
        }
        q
    }

    fn record(
        &self,
        query: &SearchQuery,
        mode: Option<SearchMode>,
        result_count: usize,
        start: Instant,
        error: Option<String>,
    ) {
        let latency = start.elapsed();
        let cache_hit = mode.is_none();
        metrics::record_search(
            mode.map(SearchMode::as_str).unwrap_or("cache"),
            cache_hit,
            error.is_some(),
            latency,
        );
        self.log.record(SearchMetric {
            query: query.text.clone(),
            region: query.region_filter.clone(),
            mode,
            result_count,
            latency,
            cache_hit,
            error,
            timestamp: SystemTime::now(),
        });
    }

    /// Drop the cached result for one `(query, region, limit)` triple.
    pub fn invalidate(&self, query: &str, region: Option<&str>, limit: usize) -> bool {
        self.cache.invalidate(&SearchQuery::new(query, region, limit).cache_key())
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("Search cache cleared");
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> SearchStats {
        self.log
            .stats(self.config.min_term_length, self.config.popular_terms_limit)
    }

    /// Retained metrics, oldest first.
    pub fn metrics(&self) -> Vec<SearchMetric> {
        self.log.snapshot()
    }

    /// Retention hook: drop metrics older than `age`.
    pub fn prune_metrics_older_than(&self, age: std::time::Duration) -> usize {
        self.log.prune_older_than(age)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::{CollectionKind, ErrorCode, MemoryStore};

    fn local(id: &str, name: &str, state: &str) -> Record {
        Record::new(CollectionKind::Locals, id)
            .with_field("name", name)
            .with_field("state", state)
    }

    fn setup(records: Vec<Record>) -> (Arc<MemoryStore>, SearchStrategy) {
        let store = Arc::new(MemoryStore::with_records(records));
        let search = SearchStrategy::new(store.clone(), &SearchConfig::default(), &CacheConfig::default());
        (store, search)
    }

    #[tokio::test]
    async fn test_short_query_skips_backend() {
        let (store, search) = setup(vec![local("1", "Local 1", "WA")]);
        assert!(search.search(" a ", None, 10).await.is_empty());
        assert_eq!(store.call_count(), 0);
        assert!(search.metrics().is_empty());
    }

    #[tokio::test]
    async fn test_basic_mode_prefix_on_primary_field() {
        let (_store, search) = setup(vec![
            local("1", "IBEW Local 46", "WA"),
            local("2", "IBEW", "OR"),
            local("3", "Carpenters", "WA"),
        ]);
        let results = search.search_scored("ibew", None, 10).await;
        let ids: Vec<_> = results.iter().map(|s| s.record.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(search.metrics()[0].mode, Some(SearchMode::Basic));
    }

    #[tokio::test]
    async fn test_advanced_mode_ranks_exact_match_first() {
        // Both share a classification so the hall is a candidate at all.
        let (_store, search) = setup(vec![
            local("hall", "IBEW Local 1234 Hall", "WA").with_field("classification", "Local union"),
            local("exact", "Local 123", "WA").with_field("classification", "Local union"),
            local("other", "Plumbers 22", "WA"),
        ]);
        let results = search.search("Local 123", None, 10).await;
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "hall"]);
    }

    #[tokio::test]
    async fn test_name_prefix_bounds_candidates() {
        let (_store, search) = setup(vec![
            local("hall", "IBEW Local 1234 Hall", "WA"),
            local("exact", "Local 123", "WA"),
        ]);
        let results = search.search("Local 123", None, 10).await;
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["exact"]);
    }

    #[tokio::test]
    async fn test_region_scopes_candidates() {
        let (_store, search) = setup(vec![local("1", "Local 46", "WA"), local("2", "Local 47", "OR")]);
        let results = search.search("local", Some("OR"), 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_then_expiry() {
        let (store, search) = setup(vec![local("1", "Local 46", "WA")]);

        let first = search.search("local", None, 10).await;
        let calls = store.call_count();
        let second = search.search("  LOCAL ", None, 10).await;
        assert_eq!(first, second);
        assert_eq!(store.call_count(), calls);

        let metrics = search.metrics();
        assert!(!metrics[0].cache_hit);
        assert!(metrics[1].cache_hit);

        store.insert_all(vec![local("2", "Local 77", "WA")]);
        tokio::time::advance(Duration::from_secs(301)).await;
        let third = search.search("local", None, 10).await;
        assert_eq!(third.len(), 2);
        assert!(store.call_count() > calls);
    }

    #[tokio::test]
    async fn test_advanced_failure_falls_back_to_basic() {
        let (store, search) = setup(vec![local("1", "Local 46", "WA")]);
        store.fail_next(ErrorCode::Unavailable, 1);

        let results = search.search("local 46", None, 10).await;
        assert_eq!(results.len(), 1);
        let metric = &search.metrics()[0];
        assert_eq!(metric.mode, Some(SearchMode::Basic));
        assert!(metric.error.is_none());
    }

    #[tokio::test]
    async fn test_total_failure_returns_empty_and_is_not_cached() {
        let (store, search) = setup(vec![local("1", "Local 46", "WA")]);
        store.fail_next(ErrorCode::Unavailable, 2);

        assert!(search.search("local 46", None, 10).await.is_empty());
        assert!(search.metrics()[0].error.is_some());
        assert_eq!(search.cached_entries(), 0);

        assert_eq!(search.search("local 46", None, 10).await.len(), 1);
        let stats = search.stats();
        assert_eq!(stats.total_searches, 2);
        assert!((stats.error_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let (_store, search) = setup(vec![local("1", "Local 46", "WA")]);
        search.search("local", None, 10).await;
        search.search("local", Some("WA"), 10).await;
        assert_eq!(search.cached_entries(), 2);

        assert!(search.invalidate("Local", None, 10));
        assert_eq!(search.cached_entries(), 1);
        search.clear_cache();
        assert_eq!(search.cached_entries(), 0);
    }
}
