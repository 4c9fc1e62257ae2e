//! Search metric log and aggregate statistics.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use super::query::SearchMode;

/// One completed search call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMetric {
    /// Normalized query text.
    pub query: String,
    pub region: Option<String>,
    /// Algorithm that produced the result. `None` for cache hits.
    pub mode: Option<SearchMode>,
    pub result_count: usize,
    #[serde(rename = "latency_ms", serialize_with = "crate::observability::serialize_millis")]
    pub latency: Duration,
    pub cache_hit: bool,
    pub error: Option<String>,
    pub timestamp: SystemTime,
}

/// A term and how many retained searches used it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularTerm {
    pub term: String,
    pub count: usize,
}

/// Aggregates over the retained metric log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchStats {
    pub total_searches: usize,
    pub cache_hit_rate: f64,
    pub error_rate: f64,
    #[serde(rename = "avg_latency_ms", serialize_with = "crate::observability::serialize_millis")]
    pub avg_latency: Duration,
    pub popular_terms: Vec<PopularTerm>,
}

/// Bounded, append-only metric log. The oldest entry is dropped when full.
#[derive(Debug)]
pub struct SearchMetricsLog {
    entries: Mutex<VecDeque<SearchMetric>>,
    capacity: usize,
}

impl SearchMetricsLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<SearchMetric>> {
        self.entries.lock().expect("search metrics mutex poisoned")
    }

    pub fn record(&self, metric: SearchMetric) {
        let mut entries = self.lock();
        entries.push_back(metric);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Copy of the retained metrics, oldest first.
    pub fn snapshot(&self) -> Vec<SearchMetric> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drop metrics recorded more than `age` ago. Returns how many were removed.
    pub fn prune_older_than(&self, age: Duration) -> usize {
        let Some(cutoff) = SystemTime::now().checked_sub(age) else {
            return 0;
        };
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|m| m.timestamp >= cutoff);
        before - entries.len()
    }

    /// Aggregate the retained log. Terms shorter than `min_term_length` are
    /// not counted as popular.
    pub fn stats(&self, min_term_length: usize, popular_limit: usize) -> SearchStats {
        let entries = self.lock();
        let total = entries.len();
        if total == 0 {
            return SearchStats {
                total_searches: 0,
                cache_hit_rate: 0.0,
                error_rate: 0.0,
                avg_latency: Duration::ZERO,
                popular_terms: Vec::new(),
            };
        }

        let hits = entries.iter().filter(|m| m.cache_hit).count();
        let errors = entries.iter().filter(|m| m.error.is_some()).count();
        let latency: Duration = entries.iter().map(|m| m.latency).sum();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for metric in entries.iter() {
            for term in metric.query.split_whitespace() {
                if term.chars().count() >= min_term_length {
                    *counts.entry(term).or_default() += 1;
                }
            }
        }
        let mut popular_terms: Vec<PopularTerm> = counts
            .into_iter()
            .map(|(term, count)| PopularTerm {
                term: term.to_string(),
                count,
            })
            .collect();
        popular_terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
        popular_terms.truncate(popular_limit);

        SearchStats {
            total_searches: total,
            cache_hit_rate: hits as f64 / total as f64,
            error_rate: errors as f64 / total as f64,
            avg_latency: latency / total as u32,
            popular_terms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(query: &str, cache_hit: bool, error: Option<&str>, latency_ms: u64) -> SearchMetric {
        SearchMetric {
            query: query.to_string(),
            region: None,
            mode: if cache_hit { None } else { Some(SearchMode::Advanced) },
            result_count: 1,
            latency: Duration::from_millis(latency_ms),
            cache_hit,
            error: error.map(str::to_string),
            timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn test_empty_stats() {
        let log = SearchMetricsLog::new(10);
        let stats = log.stats(2, 10);
        assert_eq!(stats.total_searches, 0);
        assert_eq!(stats.cache_hit_rate, 0.0);
        assert_eq!(stats.avg_latency, Duration::ZERO);
    }

    #[test]
    fn test_rates_and_average() {
        let log = SearchMetricsLog::new(10);
        log.record(metric("local 46", false, None, 30));
        log.record(metric("local 46", true, None, 0));
        log.record(metric("seattle", false, Some("unavailable"), 30));
        log.record(metric("local", false, None, 20));

        let stats = log.stats(2, 10);
        assert_eq!(stats.total_searches, 4);
        assert!((stats.cache_hit_rate - 0.25).abs() < 1e-9);
        assert!((stats.error_rate - 0.25).abs() < 1e-9);
        assert_eq!(stats.avg_latency, Duration::from_millis(20));
        assert_eq!(
            stats.popular_terms[0],
            PopularTerm {
                term: "local".to_string(),
                count: 3
            }
        );
        assert_eq!(stats.popular_terms[1].term, "46");
    }

    #[test]
    fn test_popular_terms_limit_and_min_length() {
        let log = SearchMetricsLog::new(10);
        log.record(metric("a bb cc dd", false, None, 1));
        let stats = log.stats(2, 2);
        let terms: Vec<_> = stats.popular_terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["bb", "cc"]);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let log = SearchMetricsLog::new(2);
        log.record(metric("one", false, None, 1));
        log.record(metric("two", false, None, 1));
        log.record(metric("three", false, None, 1));
        let queries: Vec<_> = log.snapshot().into_iter().map(|m| m.query).collect();
        assert_eq!(queries, vec!["two", "three"]);
    }

    #[test]
    fn test_prune_older_than() {
        let log = SearchMetricsLog::new(10);
        let mut old = metric("old", false, None, 1);
        old.timestamp = SystemTime::now() - Duration::from_secs(3600);
        log.record(old);
        log.record(metric("new", false, None, 1));

        assert_eq!(log.prune_older_than(Duration::from_secs(60)), 1);
        assert_eq!(log.snapshot()[0].query, "new");
    }
}
