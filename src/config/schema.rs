//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.
//! The numeric defaults are hand-tuned values kept configurable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::CollectionKind;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Retry and circuit breaker settings.
    pub resilience: ResilienceConfig,

    /// Ranked text search settings.
    pub search: SearchConfig,

    /// Geographic routing settings.
    pub sharding: ShardingConfig,

    /// Search result cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Retry policy and circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound for the exponential delay in milliseconds.
    pub max_delay_ms: u64,

    /// Random perturbation applied to each delay, as a fraction (0.1 = ±10%).
    pub jitter_fraction: f64,

    /// Consecutive failed calls that open the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open before a trial call, in seconds.
    pub circuit_timeout_secs: u64,
}

impl ResilienceConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn circuit_timeout(&self) -> Duration {
        Duration::from_secs(self.circuit_timeout_secs)
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            jitter_fraction: 0.1,
            failure_threshold: 5,
            circuit_timeout_secs: 60,
        }
    }
}

/// A searchable field and its relevance weight.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldWeight {
    /// Field name in the record.
    pub field: String,

    /// Multiplier applied to every term contribution from this field.
    pub weight: f64,

    /// True if the field holds an array of tags rather than text.
    #[serde(default)]
    pub array: bool,
}

impl FieldWeight {
    pub fn text(field: &str, weight: f64) -> Self {
        Self {
            field: field.to_string(),
            weight,
            array: false,
        }
    }

    pub fn tags(field: &str, weight: f64) -> Self {
        Self {
            field: field.to_string(),
            weight,
            array: true,
        }
    }
}

/// Text search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Collection searched by the enhanced search.
    pub collection: CollectionKind,

    /// Field used by basic (prefix) search.
    pub primary_field: String,

    /// Field holding the region code used to scope searches.
    pub region_field: String,

    /// Weighted fields consulted by advanced search.
    pub fields: Vec<FieldWeight>,

    /// Shorter queries return nothing.
    pub min_query_length: usize,

    /// Shorter terms are dropped during tokenization.
    pub min_term_length: usize,

    /// Maximum number of terms considered.
    pub max_terms: usize,

    /// Queries at least this long use advanced mode even without whitespace.
    pub advanced_min_length: usize,

    /// Maximum candidates fetched per field query.
    pub candidate_limit: usize,

    /// Score when a field equals the term.
    pub exact_match_bonus: f64,

    /// Score when a field starts with the term.
    pub prefix_bonus: f64,

    /// Score when a field merely contains the term.
    pub contains_bonus: f64,

    /// Weight of the term/field length ratio bonus.
    pub length_ratio_weight: f64,

    /// Search metrics kept in memory.
    pub metrics_capacity: usize,

    /// Number of popular terms reported in statistics.
    pub popular_terms_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            collection: CollectionKind::Locals,
            primary_field: "name".to_string(),
            region_field: "state".to_string(),
            fields: vec![
                FieldWeight::text("name", 1.0),
                FieldWeight::text("city", 0.8),
                FieldWeight::text("classification", 0.6),
                FieldWeight::tags("tags", 0.4),
            ],
            min_query_length: 2,
            min_term_length: 2,
            max_terms: 5,
            advanced_min_length: 5,
            candidate_limit: 50,
            exact_match_bonus: 10.0,
            prefix_bonus: 5.0,
            contains_bonus: 2.0,
            length_ratio_weight: 3.0,
            metrics_capacity: 1000,
            popular_terms_limit: 10,
        }
    }
}

/// Geographic routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShardingConfig {
    /// Field holding the state/province code of a record.
    pub region_field: String,

    /// Collection used by cross-region search.
    pub search_collection: CollectionKind,

    /// Text field matched by cross-region search.
    pub search_field: String,
}

impl Default for ShardingConfig {
    fn default() -> Self {
        Self {
            region_field: "state".to_string(),
            search_collection: CollectionKind::Locals,
            search_field: "name".to_string(),
        }
    }
}

/// Search result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of a cached result in seconds.
    pub ttl_secs: u64,

    /// Maximum number of cached results.
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 500,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
