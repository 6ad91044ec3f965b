//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the bundled downstream server (when enabled)
//! - Point the client at the server's bound ports when none are configured
//! - Serve the client until shutdown, then stop the server
//!
//! # Design Decisions
//! - Fail fast: any bind error is fatal
//! - Server starts first so the client never answers before it can pass

use thiserror::Error;

use crate::client::{Client, ClientError};
use crate::config::CrossdockConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::server::{Server, ServerError};

/// Errors bringing the harness up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("server: {0}")]
    Server(#[from] ServerError),

    #[error("client: {0}")]
    Client(#[from] ClientError),
}

/// Run server and client until `shutdown` triggers.
pub async fn run(config: CrossdockConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let mut client_config = config.client.clone();

    let server = if config.server.enabled {
        let server = Server::new(config.server.clone(), &config.timeouts);
        server.start().await?;
        if client_config.server_port_http.is_empty() {
            client_config.server_port_http = server.port_http().unwrap_or_default();
        }
        if client_config.server_port_rpc.is_empty() {
            client_config.server_port_rpc = server.port_rpc().unwrap_or_default();
        }
        Some(server)
    } else {
        tracing::info!("Bundled server disabled");
        None
    };

    let client = Client::with_timeouts(client_config, &config.timeouts);
    client.listen().await?;
    if let Some(url) = client.url() {
        tracing::info!(url = %url, "Crossdock client ready");
    }

    let result = tokio::select! {
        served = client.serve() => served,
        _ = shutdown.wait() => {
            client.close();
            Ok(())
        }
    };

    if let Some(server) = server {
        server.close();
    }
    result.map_err(StartupError::from)
}
