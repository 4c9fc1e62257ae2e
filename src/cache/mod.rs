//! Caching subsystem.
//!
//! # Data Flow
//! ```text
//! SearchStrategy
//!     → ttl.rs lookup (lazy eviction of expired entries)
//!     → miss: caller fetches, then inserts with TTL
//! ```
//!
//! # Design Decisions
//! - Entries expire lazily on the next read past `expires_at`
//! - Capacity eviction removes the entry closest to expiry
//! - Error paths never create or destroy entries

pub mod ttl;

pub use ttl::{CacheEntry, TtlCache};
