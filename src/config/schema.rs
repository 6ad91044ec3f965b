//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the harness.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::tracer::Sampler;

/// Client listen port used when `client.host_port` is blank.
pub const DEFAULT_CLIENT_PORT_HTTP: &str = "8080";
/// Downstream server HTTP port used when blank.
pub const DEFAULT_SERVER_PORT_HTTP: &str = "8081";
/// Downstream server RPC port used when blank.
pub const DEFAULT_SERVER_PORT_RPC: &str = "8082";
/// Service name reported by the bundled server.
pub const DEFAULT_SERVICE_NAME: &str = "rust";

/// Root configuration for the crossdock harness.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CrossdockConfig {
    /// Behavior client (the endpoint the orchestrator calls).
    pub client: ClientConfig,

    /// Bundled downstream server.
    pub server: ServerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Behavior client configuration.
///
/// Blank fields are filled in by [`ClientConfig::with_defaults`].
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Own bind address (e.g., ":8080", "127.0.0.1:0").
    pub host_port: String,

    /// HTTP port of the downstream servers.
    pub server_port_http: String,

    /// RPC port of the downstream servers.
    pub server_port_rpc: String,
}

impl ClientConfig {
    /// Fill blank fields with the documented defaults.
    pub fn with_defaults(mut self) -> Self {
        set_default(&mut self.host_port, &format!(":{}", DEFAULT_CLIENT_PORT_HTTP));
        set_default(&mut self.server_port_http, DEFAULT_SERVER_PORT_HTTP);
        set_default(&mut self.server_port_rpc, DEFAULT_SERVER_PORT_RPC);
        self
    }
}

/// Downstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Enable the bundled server in the main binary.
    pub enabled: bool,

    /// HTTP bind address.
    pub host_port_http: String,

    /// RPC bind address.
    pub host_port_rpc: String,

    /// Service name used for spans.
    pub service_name: String,

    /// Sampler for traces started without a forced decision.
    pub sampler: Sampler,
}

impl ServerConfig {
    /// Fill blank fields with the documented defaults.
    pub fn with_defaults(mut self) -> Self {
        set_default(&mut self.host_port_http, &format!(":{}", DEFAULT_SERVER_PORT_HTTP));
        set_default(&mut self.host_port_rpc, &format!(":{}", DEFAULT_SERVER_PORT_RPC));
        set_default(&mut self.service_name, DEFAULT_SERVICE_NAME);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host_port_http: String::new(),
            host_port_rpc: String::new(),
            service_name: String::new(),
            sampler: Sampler::Const(false),
        }
    }
}

/// Timeout configuration for downstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Downstream request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

fn set_default(value: &mut String, default: &str) {
    if value.is_empty() {
        *value = default.to_string();
    }
}
