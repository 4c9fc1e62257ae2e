//! Relevance-ranked text search.
//!
//! # Data Flow
//! ```text
//! search(query, region, limit)
//!     → query.rs (normalize, cache key, mode, terms)
//!     → TtlCache lookup ── hit ──→ cached ranking
//!     → engine.rs advanced: one candidate query per field and term
//!         └─ backend error → basic: prefix query on the primary field
//!     → scoring.rs (weighted exact / prefix / contains + length ratio)
//!     → cache insert, stats.rs metric
//! ```
//!
//! # Design Decisions
//! - Search does not go through the retry wrapper; backend errors degrade the algorithm instead
//! - Failed searches are never cached
//! - Scoring happens in memory over the deduplicated candidate set

pub mod engine;
pub mod query;
pub mod scoring;
pub mod stats;

pub use engine::SearchStrategy;
pub use query::{normalize, SearchMode, SearchQuery};
pub use scoring::{ScoredRecord, Scorer};
pub use stats::{PopularTerm, SearchMetric, SearchMetricsLog, SearchStats};
