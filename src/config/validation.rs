//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, jitter fraction in [0, 1))
//! - Check the search field table is usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let r = &config.resilience;
    if r.failure_threshold == 0 {
        errors.push(ValidationError::new("resilience.failure_threshold", "must be at least 1"));
    }
    if r.initial_delay_ms > r.max_delay_ms {
        errors.push(ValidationError::new(
            "resilience.initial_delay_ms",
            format!("{} exceeds max_delay_ms {}", r.initial_delay_ms, r.max_delay_ms),
        ));
    }
    if !(0.0..1.0).contains(&r.jitter_fraction) {
        errors.push(ValidationError::new(
            "resilience.jitter_fraction",
            format!("{} is outside [0, 1)", r.jitter_fraction),
        ));
    }

    let s = &config.search;
    if s.fields.is_empty() {
        errors.push(ValidationError::new("search.fields", "at least one weighted field is required"));
    }
    for fw in &s.fields {
        if fw.field.trim().is_empty() {
            errors.push(ValidationError::new("search.fields", "field name must not be empty"));
        }
        if !(fw.weight > 0.0 && fw.weight.is_finite()) {
            errors.push(ValidationError::new(
                "search.fields",
                format!("weight of '{}' must be positive", fw.field),
            ));
        }
    }
    if !s.fields.iter().any(|fw| fw.field == s.primary_field && !fw.array) {
        errors.push(ValidationError::new(
            "search.primary_field",
            format!("'{}' must be one of the non-array weighted fields", s.primary_field),
        ));
    }
    if s.region_field.trim().is_empty() {
        errors.push(ValidationError::new("search.region_field", "must not be empty"));
    }
    if s.min_query_length == 0 {
        errors.push(ValidationError::new("search.min_query_length", "must be at least 1"));
    }
    if s.min_term_length == 0 {
        errors.push(ValidationError::new("search.min_term_length", "must be at least 1"));
    }
    if s.max_terms == 0 {
        errors.push(ValidationError::new("search.max_terms", "must be at least 1"));
    }
    if s.candidate_limit == 0 {
        errors.push(ValidationError::new("search.candidate_limit", "must be at least 1"));
    }
    if s.metrics_capacity == 0 {
        errors.push(ValidationError::new("search.metrics_capacity", "must be at least 1"));
    }

    let sh = &config.sharding;
    if sh.region_field.trim().is_empty() {
        errors.push(ValidationError::new("sharding.region_field", "must not be empty"));
    }
    if sh.search_field.trim().is_empty() {
        errors.push(ValidationError::new("sharding.search_field", "must not be empty"));
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be at least 1"));
    }
    if config.cache.max_entries == 0 {
        errors.push(ValidationError::new("cache.max_entries", "must be at least 1"));
    }

    let o = &config.observability;
    if o.metrics_enabled && o.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", o.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
