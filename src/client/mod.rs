//! Gateway client.
//!
//! # Data Flow
//! ```text
//! caller
//!     → CoreClient
//!         ├─ point ops / batch / transaction → ResilienceStrategy → DocumentSource
//!         ├─ query with `state == code` → ShardingStrategy scope → ResilienceStrategy
//!         ├─ search_enhanced → SearchStrategy (own cache and fallback, no retry)
//!         └─ search_nearby → ResilienceStrategy → ShardingStrategy cross-region
//! ```
//!
//! # Design Decisions
//! - Explicit construction; no process-wide instance
//! - Strategies never hold a pointer back to the client
//! - Operation names are `<collection>.<op>` for logs and metrics

pub mod gateway;

pub use gateway::{ClientStats, CoreClient};
