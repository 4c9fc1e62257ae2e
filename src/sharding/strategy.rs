//! Region routing for collection reads and cross-region search.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::BoxStream;
use serde::Serialize;

use crate::config::ShardingConfig;
use crate::observability::metrics;
use crate::store::{
    CollectionKind, Cursor, DocumentSource, FieldValue, Filter, Query, Record, StoreResult,
};

use super::regions::{region_for_code, RegionId};

/// Where a routed read runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Regional(RegionId),
    /// Unpartitioned scope ("all").
    Global,
}

impl Partition {
    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Regional(id) => id.as_str(),
            Partition::Global => "all",
        }
    }

    /// Filter restricting `region_field` to this partition's member codes.
    pub fn scope_filter(self, region_field: &str) -> Option<Filter> {
        match self {
            Partition::Regional(id) => Some(Filter::In {
                field: region_field.to_string(),
                values: id
                    .region()
                    .member_codes
                    .iter()
                    .map(|code| FieldValue::from(*code))
                    .collect(),
            }),
            Partition::Global => None,
        }
    }
}

/// Routing counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardingStats {
    pub regional_query_count: u64,
    pub cross_regional_query_count: u64,
    /// Regional share of all routed queries, 0-100.
    pub regional_percentage: f64,
}

/// Resolves region codes to partitions and issues scoped reads.
pub struct ShardingStrategy {
    source: Arc<dyn DocumentSource>,
    config: ShardingConfig,
    regional_queries: AtomicU64,
    cross_regional_queries: AtomicU64,
}

impl ShardingStrategy {
    pub fn new(source: Arc<dyn DocumentSource>, config: &ShardingConfig) -> Self {
        Self {
            source,
            config: config.clone(),
            regional_queries: AtomicU64::new(0),
            cross_regional_queries: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ShardingConfig {
        &self.config
    }

    /// Resolve a region code. Absent or unknown codes route to the global scope.
    pub fn route(&self, code: Option<&str>) -> Partition {
        let partition = code
            .and_then(region_for_code)
            .map(Partition::Regional)
            .unwrap_or(Partition::Global);
        tracing::debug!(code = ?code, partition = partition.as_str(), "Routed region code");
        partition
    }

    /// Build the query for a routed read and count it.
    pub fn routed_query(
        &self,
        collection: CollectionKind,
        code: Option<&str>,
        limit: usize,
        cursor: Option<Cursor>,
        filters: Vec<Filter>,
    ) -> Query {
        let query = Query::new(collection)
            .filters(filters)
            .limit(limit)
            .start_after(cursor);
        self.scope(query, code)
    }

    /// Restrict `query` to the partition owning `code` and count it.
    pub fn scope(&self, query: Query, code: Option<&str>) -> Query {
        let partition = self.route(code);
        self.count(partition);
        match partition.scope_filter(&self.config.region_field) {
            Some(scope) => query.filter(scope),
            None => query,
        }
    }

    /// Stream of `collection` records from the partition owning `code`.
    pub fn get_optimized_stream(
        &self,
        collection: CollectionKind,
        code: Option<&str>,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> BoxStream<'static, StoreResult<Record>> {
        let query = self.routed_query(collection, code, limit, cursor, Vec::new());
        self.source.stream(query)
    }

    /// Prefix search over the primary region and its neighbours.
    ///
    /// Each region is queried with `ceil(limit / regions)` results; regions
    /// are consulted nearest first until `limit` distinct records are
    /// collected. Absent or unknown codes run a single global query.
    pub async fn search_across_regions(
        &self,
        query: &str,
        primary_code: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Record>> {
        self.cross_regional_queries.fetch_add(1, Ordering::Relaxed);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let text = query.trim();

        let primary = match self.route(primary_code) {
            Partition::Regional(id) => id,
            Partition::Global => {
                metrics::record_shard_query("cross_region", "all");
                return self.source.query(self.search_query(text, None, limit)).await;
            }
        };
        metrics::record_shard_query("cross_region", primary.as_str());

        let regions: Vec<RegionId> = std::iter::once(primary)
            .chain(primary.adjacent().iter().copied())
            .collect();
        let sub_limit = limit.div_ceil(regions.len());

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(limit);
        for region in regions {
            let found = self
                .source
                .query(self.search_query(text, Some(Partition::Regional(region)), sub_limit))
                .await?;
            for record in found {
                if seen.insert(record.id.clone()) {
                    results.push(record);
                }
            }
            if results.len() >= limit {
                tracing::debug!(region = %region, collected = results.len(), "Cross-region search satisfied");
                break;
            }
        }
        results.truncate(limit);
        Ok(results)
    }

    fn search_query(&self, text: &str, partition: Option<Partition>, limit: usize) -> Query {
        let mut query = Query::new(self.config.search_collection)
            .filter(Filter::prefix(self.config.search_field.clone(), text))
            .order_by(self.config.search_field.clone(), false)
            .limit(limit);
        if let Some(scope) = partition.and_then(|p| p.scope_filter(&self.config.region_field)) {
            query = query.filter(scope);
        }
        query
    }

    fn count(&self, partition: Partition) {
        match partition {
            Partition::Regional(id) => {
                self.regional_queries.fetch_add(1, Ordering::Relaxed);
                metrics::record_shard_query("regional", id.as_str());
            }
            Partition::Global => {
                self.cross_regional_queries.fetch_add(1, Ordering::Relaxed);
                metrics::record_shard_query("global", "all");
            }
        }
    }

    pub fn stats(&self) -> ShardingStats {
        let regional = self.regional_queries.load(Ordering::Relaxed);
        let cross = self.cross_regional_queries.load(Ordering::Relaxed);
        let total = regional + cross;
        let regional_percentage = if total == 0 {
            0.0
        } else {
            regional as f64 / total as f64 * 100.0
        };
        ShardingStats {
            regional_query_count: regional,
            cross_regional_query_count: cross,
            regional_percentage,
        }
    }
}
