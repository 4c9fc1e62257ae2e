//! Resilient, strategy-composed access layer over a document store.

pub mod cache;
pub mod client;
pub mod config;
pub mod observability;
pub mod resilience;
pub mod search;
pub mod sharding;
pub mod store;

pub use client::{ClientStats, CoreClient};
pub use config::schema::GatewayConfig;
pub use store::{DocumentSource, MemoryStore, Record};
