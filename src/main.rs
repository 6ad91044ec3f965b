//! Crossdock harness entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!   Orchestrator                  ┌──────────────────────────────────────────┐
//!   GET /?behavior=trace ────────▶│ client (behavior endpoint, :8080)        │
//!                                 │   crossdock::run → trace behavior        │
//!                                 └──────────────┬───────────────────────────┘
//!                                                │ POST /start_trace
//!                                                ▼
//!                                 ┌──────────────────────────────────────────┐
//!                                 │ server (HTTP :8081, RPC :8082)           │
//!                                 │   S1 ──http/rpc──▶ S2 ──http/rpc──▶ S3   │
//!                                 │   tracer: uber-trace-id propagation      │
//!                                 └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use trace_crossdock::config::{load_config, validate_config, ConfigError, CrossdockConfig};
use trace_crossdock::lifecycle::{self, signals, Shutdown};
use trace_crossdock::observability;

#[derive(Parser)]
#[command(name = "crossdock")]
#[command(about = "Crossdock client and server for tracer interoperability tests", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Client bind address (e.g. ":8080").
    #[arg(long)]
    client_host_port: Option<String>,

    /// HTTP port of the downstream servers.
    #[arg(long)]
    server_port_http: Option<String>,

    /// RPC port of the downstream servers.
    #[arg(long)]
    server_port_rpc: Option<String>,

    /// Do not start the bundled server.
    #[arg(long)]
    no_server: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut CrossdockConfig) {
        if let Some(host_port) = self.client_host_port {
            config.client.host_port = host_port;
        }
        if let Some(port) = self.server_port_http {
            config.client.server_port_http = port;
        }
        if let Some(port) = self.server_port_rpc {
            config.client.server_port_rpc = port;
        }
        if self.no_server {
            config.server.enabled = false;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CrossdockConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    observability::init_logging(&config.observability.log_level);

    tracing::info!(
        client_host_port = %config.client.host_port,
        server_enabled = config.server.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_ctrl_c(shutdown.clone()));

    lifecycle::run(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_are_validated() {
        let cli = Cli::parse_from(["crossdock", "--server-port-http", "abc"]);
        let mut config = CrossdockConfig::default();
        cli.apply(&mut config);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "client.server_port_http");
    }

    #[test]
    fn test_valid_overrides_pass() {
        let cli = Cli::parse_from(["crossdock", "--client-host-port", ":9080", "--no-server"]);
        let mut config = CrossdockConfig::default();
        cli.apply(&mut config);

        assert!(validate_config(&config).is_ok());
        assert_eq!(config.client.host_port, ":9080");
        assert!(!config.server.enabled);
    }
}
