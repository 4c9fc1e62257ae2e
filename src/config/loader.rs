//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CollectionKind;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.resilience.failure_threshold, 5);
        assert_eq!(config.search.collection, CollectionKind::Locals);
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
            [resilience]
            max_retries = 1
            circuit_timeout_secs = 5

            [search]
            collection = "jobs"
            primary_field = "title"
            fields = [
                { field = "title", weight = 1.0 },
                { field = "skills", weight = 0.5, array = true },
            ]
        "#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.resilience.max_retries, 1);
        assert_eq!(config.resilience.initial_delay_ms, 1000);
        assert_eq!(config.search.collection, CollectionKind::Jobs);
        assert!(config.search.fields[1].array);
    }

    #[test]
    fn test_unknown_collection_is_parse_error() {
        let err = parse_config("[search]\ncollection = \"widgets\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_message() {
        let err = parse_config("[cache]\nttl_secs = 0\nmax_entries = 0\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Validation failed: "));
        assert!(msg.contains("cache.ttl_secs"));
        assert!(msg.contains("cache.max_entries"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
