//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Operation from CoreClient:
//!     → circuit_breaker.rs (fail fast while open and cooling down)
//!     → invoke operation
//!     → On failure: retries.rs (classify, retry transient errors with backoff.rs delays)
//!     → circuit_breaker.rs (final outcome recorded: success resets, failure counts)
//! ```
//!
//! # Design Decisions
//! - One breaker per strategy instance, shared by every operation it wraps
//! - Retries only for transient error codes; operations must be idempotent
//! - Circuit-open is a distinct error so callers can show "try again shortly"
//! - Streams are retried by recreation, not by resuming

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod types;

pub use backoff::RetryPolicy;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerState, CircuitBreakerStatus, CircuitStatus};
pub use retries::{is_retryable, ResilienceStrategy};
pub use types::{ResilienceError, ResilienceResult};
