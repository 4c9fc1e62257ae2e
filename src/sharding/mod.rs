//! Geographic sharding.
//!
//! # Data Flow
//! ```text
//! region code (e.g. "WA")
//!     → regions.rs lookup (trim, uppercase) → RegionId or none
//!     → strategy.rs Partition::{Regional, Global}
//!     → scope filter `state IN members` added to the query
//! ```
//!
//! # Design Decisions
//! - The region table is static and immutable at runtime
//! - An unknown code is not an error; it routes to the global scope
//! - Cross-region search walks the adjacency table nearest first and stops early

pub mod regions;
pub mod strategy;

pub use regions::{region_for_code, Region, RegionId, REGIONS};
pub use strategy::{Partition, ShardingStats, ShardingStrategy};
