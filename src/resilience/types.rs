//! Resilience error types.

use std::time::Duration;

use thiserror::Error;

use crate::store::{ErrorCode, StoreError};

/// Errors surfaced by the resilience layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResilienceError {
    /// The breaker is open and its timeout has not elapsed. The operation was
    /// not invoked.
    #[error("circuit open for '{operation}', retry in {retry_after:?}")]
    CircuitOpen {
        operation: String,
        retry_after: Duration,
    },

    /// A non-retryable failure, surfaced after a single attempt.
    #[error("operation '{operation}' failed: {source}")]
    Permanent {
        operation: String,
        #[source]
        source: StoreError,
    },

    /// Transient failures persisted through every allowed retry.
    #[error("operation '{operation}' failed after {retries} retries: {source}")]
    RetriesExhausted {
        operation: String,
        retries: u32,
        #[source]
        source: StoreError,
    },
}

impl ResilienceError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    pub fn operation(&self) -> &str {
        match self {
            ResilienceError::CircuitOpen { operation, .. }
            | ResilienceError::Permanent { operation, .. }
            | ResilienceError::RetriesExhausted { operation, .. } => operation,
        }
    }

    /// The underlying backend error, if the backend was reached.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            ResilienceError::CircuitOpen { .. } => None,
            ResilienceError::Permanent { source, .. }
            | ResilienceError::RetriesExhausted { source, .. } => Some(source),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.store_error().map(|e| e.code)
    }
}

/// Result type for wrapped operations.
pub type ResilienceResult<T> = Result<T, ResilienceError>;
