//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resilience / search / sharding / cache produce:
//!     → tracing events (structured key/value fields)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - In-process statistics (circuit, search, sharding) live with their
//!   strategies; this module only exports them
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

use std::time::Duration;

use serde::Serializer;

/// Serialize a duration as fractional milliseconds in stats snapshots.
pub(crate) fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}
