//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::CrossdockConfig;
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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<CrossdockConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<CrossdockConfig, ConfigError> {
    let config: CrossdockConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_config(
            r#"
            [client]
            host_port = "127.0.0.1:0"

            [server]
            service_name = "rust-s"
            sampler = { type = "probabilistic", param = 0.25 }
            "#,
        )
        .unwrap();
        assert_eq!(config.client.host_port, "127.0.0.1:0");
        assert_eq!(config.server.service_name, "rust-s");
    }

    #[test]
    fn test_validation_error_message_lists_fields() {
        let err = parse_config(
            r#"
            [client]
            server_port_http = "abc"
            server_port_rpc = "def"
            "#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("client.server_port_http"));
        assert!(message.contains("client.server_port_rpc"));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[client\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/crossdock.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
