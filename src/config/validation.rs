//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Blank addresses are valid: defaults are applied later

use thiserror::Error;

use crate::config::schema::CrossdockConfig;
use crate::tracer::Sampler;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &CrossdockConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_host_port(&mut errors, "client.host_port", &config.client.host_port);
    check_port(&mut errors, "client.server_port_http", &config.client.server_port_http);
    check_port(&mut errors, "client.server_port_rpc", &config.client.server_port_rpc);
    check_host_port(&mut errors, "server.host_port_http", &config.server.host_port_http);
    check_host_port(&mut errors, "server.host_port_rpc", &config.server.host_port_rpc);

    if let Sampler::Probabilistic(rate) = config.server.sampler {
        if !(0.0..=1.0).contains(&rate) {
            errors.push(ValidationError::new(
                "server.sampler",
                format!("probabilistic rate {} outside [0, 1]", rate),
            ));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_port(errors: &mut Vec<ValidationError>, field: &'static str, port: &str) {
    if port.is_empty() {
        return;
    }
    if port.parse::<u16>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid port '{}'", port)));
    }
}

fn check_host_port(errors: &mut Vec<ValidationError>, field: &'static str, host_port: &str) {
    if host_port.is_empty() {
        return;
    }
    match host_port.rsplit_once(':') {
        Some((_, port)) => check_port(errors, field, port),
        None => errors.push(ValidationError::new(
            field,
            format!("expected host:port, got '{}'", host_port),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&CrossdockConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = CrossdockConfig::default();
        config.client.host_port = "localhost".into();
        config.client.server_port_http = "http".into();
        config.server.host_port_rpc = ":70000".into();
        config.server.sampler = Sampler::Probabilistic(1.5);
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "client.host_port",
                "client.server_port_http",
                "server.host_port_rpc",
                "server.sampler",
                "timeouts.request_secs",
            ]
        );
    }

    #[test]
    fn test_ipv6_host_port() {
        let mut config = CrossdockConfig::default();
        config.client.host_port = "[::1]:0".into();
        assert!(validate_config(&config).is_ok());
    }
}
