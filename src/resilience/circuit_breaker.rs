//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: backend assumed down, calls fail fast
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failed calls >= threshold
//! Open → Closed: timeout elapsed, the next call is attempted and succeeds
//! Open → Open: timeout elapsed, the trial call fails (cooldown restarts)
//! Closed → Closed: success resets the failure count
//! ```
//!
//! # Design Decisions
//! - No timer: the Open → Closed check runs only when a call arrives
//! - Several callers may run trial calls concurrently once the timeout elapses
//! - State sits behind a mutex; critical sections never await

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::observability::metrics;

/// Breaker position. An open breaker always knows when it opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitStatus {
    Closed,
    Open { opened_at: Instant },
}

/// Mutable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerState {
    pub status: CircuitStatus,
    /// Consecutive failed calls while closed.
    pub failure_count: u32,
}

impl CircuitBreakerState {
    pub fn opened_at(&self) -> Option<Instant> {
        match self.status {
            CircuitStatus::Open { opened_at } => Some(opened_at),
            CircuitStatus::Closed => None,
        }
    }
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self {
            status: CircuitStatus::Closed,
            failure_count: 0,
        }
    }
}

/// How a call was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Breaker closed.
    Normal,
    /// Breaker open but its timeout has elapsed.
    Trial,
}

/// Observable breaker snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerStatus {
    pub is_open: bool,
    pub failure_count: u32,
    pub threshold: u32,
    #[serde(rename = "time_until_reset_ms", serialize_with = "crate::observability::serialize_millis")]
    pub time_until_reset: Duration,
}

/// A consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<CircuitBreakerState>,
    threshold: u32,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, timeout: Duration) -> Self {
        Self {
            state: Mutex::new(CircuitBreakerState::default()),
            threshold: threshold.max(1),
            timeout,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CircuitBreakerState> {
        self.state.lock().expect("circuit breaker mutex poisoned")
    }

    /// Decide whether a call may proceed.
    ///
    /// Returns the remaining cooldown if the breaker is open and its timeout
    /// has not elapsed. State is not changed here; the outcome of the call
    /// decides the next transition.
    pub fn admit(&self) -> Result<Admission, Duration> {
        let state = self.lock();
        match state.status {
            CircuitStatus::Closed => Ok(Admission::Normal),
            CircuitStatus::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed < self.timeout {
                    Err(self.timeout - elapsed)
                } else {
                    Ok(Admission::Trial)
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut state = self.lock();
        state.failure_count = 0;
        if matches!(state.status, CircuitStatus::Open { .. }) {
            state.status = CircuitStatus::Closed;
            tracing::info!("Circuit closed after successful trial call");
            metrics::record_circuit_state(false);
        }
    }

    /// Record a failed call admitted as `admission`. Returns true if this
    /// failure opened the breaker.
    ///
    /// While open, only a failed trial restarts the cooldown; calls admitted
    /// before the breaker opened do not extend it.
    pub fn record_failure(&self, admission: Admission) -> bool {
        let mut state = self.lock();
        let now = Instant::now();
        match state.status {
            CircuitStatus::Closed => {
                state.failure_count += 1;
                if state.failure_count >= self.threshold {
                    state.status = CircuitStatus::Open { opened_at: now };
                    tracing::warn!(
                        failures = state.failure_count,
                        threshold = self.threshold,
                        timeout = ?self.timeout,
                        "Circuit opened"
                    );
                    metrics::record_circuit_state(true);
                    return true;
                }
                false
            }
            CircuitStatus::Open { .. } if admission == Admission::Trial => {
                state.status = CircuitStatus::Open { opened_at: now };
                tracing::warn!(timeout = ?self.timeout, "Trial call failed, circuit stays open");
                false
            }
            CircuitStatus::Open { .. } => {
                tracing::debug!("Failure from a call admitted before the circuit opened");
                false
            }
        }
    }

    /// Force the breaker closed and clear the failure count.
    pub fn reset(&self) {
        *self.lock() = CircuitBreakerState::default();
        metrics::record_circuit_state(false);
        tracing::info!("Circuit reset");
    }

    /// Copy of the raw state.
    pub fn state(&self) -> CircuitBreakerState {
        *self.lock()
    }

    pub fn status(&self) -> CircuitBreakerStatus {
        let state = self.state();
        let time_until_reset = state
            .opened_at()
            .map(|opened_at| self.timeout.saturating_sub(opened_at.elapsed()))
            .unwrap_or(Duration::ZERO);
        CircuitBreakerStatus {
            is_open: state.opened_at().is_some(),
            failure_count: state.failure_count,
            threshold: self.threshold,
            time_until_reset,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_trips_at_threshold() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(30));
        assert!(!cb.record_failure(Admission::Normal));
        assert!(!cb.record_failure(Admission::Normal));
        assert_eq!(cb.admit(), Ok(Admission::Normal));
        assert!(cb.record_failure(Admission::Normal));

        let state = cb.state();
        assert!(state.opened_at().is_some());
        assert_eq!(state.failure_count, 3);
        assert_eq!(cb.admit(), Err(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_count() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(30));
        cb.record_failure(Admission::Normal);
        cb.record_failure(Admission::Normal);
        cb.record_success();
        assert_eq!(cb.state().failure_count, 0);
        cb.record_failure(Admission::Normal);
        cb.record_failure(Admission::Normal);
        assert_eq!(cb.admit(), Ok(Admission::Normal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_after_timeout() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(10));
        cb.record_failure(Admission::Normal);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cb.admit(), Err(Duration::from_secs(6)));
        assert_eq!(cb.status().time_until_reset, Duration::from_secs(6));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cb.admit(), Ok(Admission::Trial));
        // Admission alone does not close the breaker.
        assert!(cb.status().is_open);

        cb.record_success();
        let status = cb.status();
        assert!(!status.is_open);
        assert_eq!(status.failure_count, 0);
        assert_eq!(status.time_until_reset, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_restarts_cooldown() {
        let cb = CircuitBreaker::new(2, Duration::from_secs(10));
        cb.record_failure(Admission::Normal);
        cb.record_failure(Admission::Normal);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cb.admit(), Ok(Admission::Trial));
        assert!(!cb.record_failure(Admission::Trial));

        let state = cb.state();
        assert_eq!(state.failure_count, 2);
        assert_eq!(cb.admit(), Err(Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(10));
        cb.record_failure(Admission::Normal);
        cb.reset();
        assert_eq!(cb.state(), CircuitBreakerState::default());
        assert_eq!(cb.admit(), Ok(Admission::Normal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_straggler_failure_does_not_extend_cooldown() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(10));
        cb.record_failure(Admission::Normal);

        tokio::time::advance(Duration::from_secs(4)).await;
        // A call admitted while closed finishes after the breaker opened.
        assert!(!cb.record_failure(Admission::Normal));
        assert_eq!(cb.admit(), Err(Duration::from_secs(6)));
        assert_eq!(cb.state().failure_count, 1);
    }
}
