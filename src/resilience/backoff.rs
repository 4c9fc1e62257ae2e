//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::ResilienceConfig;

/// How many times and how patiently a failed operation is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Each delay is perturbed uniformly within ±`jitter_fraction` of itself.
    pub jitter_fraction: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: config.initial_delay(),
            max_delay: config.max_delay(),
            jitter_fraction: config.jitter_fraction,
        }
    }

    /// Unjittered delay before retry number `retry` (0-based):
    /// `min(initial_delay * 2^retry, max_delay)`.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Jittered delay before retry number `retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        apply_jitter(self.base_delay(retry), self.jitter_fraction)
    }

    /// True if another retry is allowed after `retries_done` retries.
    pub fn allows_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}

/// Perturb `delay` uniformly within ±`fraction` of its value.
pub fn apply_jitter(delay: Duration, fraction: f64) -> Duration {
    if fraction <= 0.0 || delay.is_zero() {
        return delay;
    }
    let fraction = fraction.min(1.0);
    let factor = 1.0 + rand::thread_rng().gen_range(-fraction..=fraction);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}
