//! Retry logic.
//!
//! # Responsibilities
//! - Determine if an error is retryable (transient codes only)
//! - Execute retries with exponential backoff + jitter
//! - Consult and feed the circuit breaker around every attempt
//!
//! # Design Decisions
//! - Operations are assumed idempotent; callers own that guarantee
//! - Only the final outcome of a call counts against the breaker
//! - Delays are timed suspensions and cannot be cancelled once entered
//! - No per-attempt deadline is enforced here; the transport supplies it

use std::future::Future;
use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};

use crate::config::ResilienceConfig;
use crate::observability::metrics;
use crate::resilience::backoff::RetryPolicy;
use crate::resilience::circuit_breaker::{Admission, CircuitBreaker, CircuitBreakerStatus};
use crate::resilience::types::{ResilienceError, ResilienceResult};
use crate::store::{StoreError, StoreResult};

/// True if `err` may be retried.
pub fn is_retryable(err: &StoreError) -> bool {
    err.is_retryable()
}

/// Retry + circuit breaker wrapper for asynchronous operations.
///
/// Cloning shares the breaker.
#[derive(Debug, Clone)]
pub struct ResilienceStrategy {
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl ResilienceStrategy {
    pub fn new(policy: RetryPolicy, breaker: Arc<CircuitBreaker>) -> Self {
        Self { policy, breaker }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(
            RetryPolicy::from_config(config),
            Arc::new(CircuitBreaker::new(
                config.failure_threshold,
                config.circuit_timeout(),
            )),
        )
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn circuit_status(&self) -> CircuitBreakerStatus {
        self.breaker.status()
    }

    /// Run `operation` under the retry policy and circuit breaker.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        name: &str,
        mut operation: F,
    ) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut retries = 0u32;
        loop {
            let admission = admit(&self.breaker, name)?;
            if admission == Admission::Trial {
                tracing::info!(operation = %name, "Circuit timeout elapsed, attempting trial call");
            }

            match operation().await {
                Ok(value) => {
                    self.breaker.record_success();
                    metrics::record_attempt(name, "success");
                    if retries > 0 {
                        tracing::info!(operation = %name, retries, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    metrics::record_attempt(name, "failure");
                    if let Some(final_err) = classify_failure(&self.policy, &self.breaker, admission, name, retries, err.clone()) {
                        return Err(final_err);
                    }

                    let delay = self.policy.delay_for(retries);
                    tracing::warn!(
                        operation = %name,
                        attempt = retries + 1,
                        delay = ?delay,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    metrics::record_retry(name, delay);
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
            }
        }
    }

    /// Apply the same policy to a continuously produced sequence.
    ///
    /// On a retryable error the current stream is dropped and a new one is
    /// created from `factory` after the backoff delay. Retries are counted
    /// over the lifetime of the returned stream. A terminal error is yielded
    /// once, then the stream ends.
    pub fn execute_stream_with_retry<T, F>(
        &self,
        name: &str,
        factory: F,
    ) -> BoxStream<'static, ResilienceResult<T>>
    where
        T: Send + 'static,
        F: Fn() -> BoxStream<'static, StoreResult<T>> + Send + 'static,
    {
        let state = StreamState {
            name: name.to_string(),
            factory,
            current: None,
            admission: Admission::Normal,
            yielded: false,
            retries: 0,
            done: false,
            policy: self.policy.clone(),
            breaker: self.breaker.clone(),
        };

        stream::unfold(state, |mut st| async move {
            loop {
                if st.done {
                    return None;
                }

                if st.current.is_none() {
                    match admit(&st.breaker, &st.name) {
                        Ok(admission) => st.admission = admission,
                        Err(err) => {
                            st.done = true;
                            return Some((Err(err), st));
                        }
                    }
                    st.yielded = false;
                    st.current = Some((st.factory)());
                }
                let current = st.current.as_mut()?;

                match current.next().await {
                    Some(Ok(item)) => {
                        st.breaker.record_success();
                        st.yielded = true;
                        return Some((Ok(item), st));
                    }
                    None => {
                        // An empty stream that ended cleanly is still a success.
                        if !st.yielded {
                            st.breaker.record_success();
                            metrics::record_attempt(&st.name, "success");
                        }
                        return None;
                    }
                    Some(Err(err)) => {
                        st.current = None;
                        metrics::record_attempt(&st.name, "failure");
                        if let Some(final_err) =
                            classify_failure(&st.policy, &st.breaker, st.admission, &st.name, st.retries, err.clone())
                        {
                            st.done = true;
                            return Some((Err(final_err), st));
                        }

                        let delay = st.policy.delay_for(st.retries);
                        tracing::warn!(
                            operation = %st.name,
                            attempt = st.retries + 1,
                            delay = ?delay,
                            error = %err,
                            "Stream failed, recreating"
                        );
                        metrics::record_retry(&st.name, delay);
                        tokio::time::sleep(delay).await;
                        st.retries += 1;
                    }
                }
            }
        })
        .boxed()
    }
}

struct StreamState<T, F> {
    name: String,
    factory: F,
    current: Option<BoxStream<'static, StoreResult<T>>>,
    /// How the current stream was admitted.
    admission: Admission,
    /// True once the current stream produced an item.
    yielded: bool,
    retries: u32,
    done: bool,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

fn admit(breaker: &CircuitBreaker, name: &str) -> ResilienceResult<Admission> {
    breaker.admit().map_err(|retry_after| {
        tracing::debug!(operation = %name, retry_after = ?retry_after, "Circuit open, failing fast");
        metrics::record_circuit_rejection(name);
        ResilienceError::CircuitOpen {
            operation: name.to_string(),
            retry_after,
        }
    })
}

/// Returns the terminal error for a failed attempt, or `None` if it should
/// be retried. Terminal failures are recorded on the breaker.
fn classify_failure(
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    admission: Admission,
    name: &str,
    retries: u32,
    err: StoreError,
) -> Option<ResilienceError> {
    if !is_retryable(&err) {
        breaker.record_failure(admission);
        tracing::warn!(operation = %name, error = %err, "Non-retryable failure");
        return Some(ResilienceError::Permanent {
            operation: name.to_string(),
            source: err,
        });
    }
    if !policy.allows_retry(retries) {
        breaker.record_failure(admission);
        tracing::error!(operation = %name, retries, error = %err, "Retries exhausted");
        return Some(ResilienceError::RetriesExhausted {
            operation: name.to_string(),
            retries,
            source: err,
        });
    }
    None
}
