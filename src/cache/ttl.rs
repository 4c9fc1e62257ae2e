//! Concurrent key/value cache with per-entry time-to-live.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::observability::metrics;

/// A cached value and its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A thread-safe TTL cache.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    name: &'static str,
    inner: Arc<DashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache. `name` labels the size metric.
    pub fn new(name: &'static str, default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            name,
            inner: Arc::new(DashMap::new()),
            default_ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Return the live value for `key`, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.inner.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }

        self.inner.remove_if(key, |_, entry| entry.is_expired(now));
        tracing::debug!(cache = self.name, key = %key, "Evicted expired cache entry");
        metrics::record_cache_size(self.name, self.inner.len());
        None
    }

    /// Insert with the default TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        if !self.inner.contains_key(&key) && self.inner.len() >= self.max_entries {
            self.make_room();
        }

        let entry = CacheEntry {
            key: key.clone(),
            value,
            expires_at: Instant::now() + ttl,
        };
        self.inner.insert(key, entry);
        metrics::record_cache_size(self.name, self.inner.len());
    }

    /// Remove `key`. Returns true if an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.inner.remove(key).is_some();
        metrics::record_cache_size(self.name, self.inner.len());
        removed
    }

    pub fn clear(&self) {
        self.inner.clear();
        metrics::record_cache_size(self.name, 0);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_cache_size(self.name, self.inner.len());
        removed
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn make_room(&self) {
        if self.purge_expired() > 0 && self.inner.len() < self.max_entries {
            return;
        }
        let victim = self
            .inner
            .iter()
            .min_by_key(|entry| entry.expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.inner.remove(&key);
            tracing::debug!(cache = self.name, key = %key, "Evicted cache entry at capacity");
        }
    }
}
