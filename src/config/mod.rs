//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to CoreClient::new, which builds every strategy from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the region table is compiled in
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CacheConfig, FieldWeight, GatewayConfig, ObservabilityConfig, ResilienceConfig, SearchConfig,
    ShardingConfig,
};
pub use validation::{validate_config, ValidationError};
