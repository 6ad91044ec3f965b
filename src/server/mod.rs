//! Cooperating downstream server.
//!
//! # Data Flow
//! ```text
//! Client ──HTTP POST /start_trace──▶ S1 (root span, baggage set)
//!                                     │  HTTP /join_trace or RPC join_trace
//!                                     ▼
//!                                    S2 (child span from propagated context)
//!                                     │
//!                                     ▼
//!                                    S3
//! Each level answers with the span it observed plus its downstream's answer.
//! ```
//!
//! # Design Decisions
//! - One process can play every role; the request names the role
//! - HTTP and RPC front ends share a single `TraceHandler`
//! - Both loops stop on the same shutdown signal

pub mod handlers;

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::{
    routing::{any, post},
    Router,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::{ServerConfig, TimeoutConfig};
use crate::lifecycle::Shutdown;
use crate::net::{self, ListenerError};
use crate::tracer::Tracer;
use crate::transport::rpc;

pub use handlers::TraceHandler;

/// Errors starting the downstream server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server already started")]
    AlreadyStarted,
}

#[derive(Debug, Clone, Copy)]
struct BoundAddrs {
    http: SocketAddr,
    rpc: SocketAddr,
}

/// Downstream server answering `/start_trace` and `/join_trace`.
pub struct Server {
    config: ServerConfig,
    handler: Arc<TraceHandler>,
    addrs: OnceLock<BoundAddrs>,
    shutdown: Shutdown,
    rpc_read_timeout: Duration,
}

impl Server {
    pub fn new(config: ServerConfig, timeouts: &TimeoutConfig) -> Self {
        let config = config.with_defaults();
        let tracer = Tracer::new(config.service_name.clone(), config.sampler);
        Self {
            handler: Arc::new(TraceHandler::new(tracer, timeouts)),
            config,
            addrs: OnceLock::new(),
            shutdown: Shutdown::new(),
            rpc_read_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind both listeners and serve them on background tasks.
    ///
    /// Returns once both sockets are bound.
    pub async fn start(&self) -> Result<Vec<JoinHandle<()>>, ServerError> {
        if self.addrs.get().is_some() {
            return Err(ServerError::AlreadyStarted);
        }

        let (http_listener, http) = net::bind(&self.config.host_port_http).await?;
        let (rpc_listener, rpc) = net::bind(&self.config.host_port_rpc).await?;
        self.addrs
            .set(BoundAddrs { http, rpc })
            .map_err(|_| ServerError::AlreadyStarted)?;

        tracing::info!(
            service = %self.config.service_name,
            http = %http,
            rpc = %rpc,
            "Crossdock server starting"
        );

        let app = Self::build_router(self.handler.clone());
        let stopped = self.shutdown.wait();
        let http_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(http_listener, app)
                .with_graceful_shutdown(stopped)
                .await
            {
                tracing::error!(error = %e, "HTTP server failed");
            }
            tracing::info!("HTTP server stopped");
        });

        let rpc_task = tokio::spawn(rpc::serve(
            rpc_listener,
            self.handler.clone(),
            self.shutdown.clone(),
            self.rpc_read_timeout,
        ));

        Ok(vec![http_task, rpc_task])
    }

    fn build_router(handler: Arc<TraceHandler>) -> Router {
        Router::new()
            .route("/", any(handlers::health))
            .route("/start_trace", post(handlers::start_trace))
            .route("/join_trace", post(handlers::join_trace))
            .with_state(handler)
            .layer(TraceLayer::new_for_http())
    }

    /// Stop both loops. Safe to call more than once.
    pub fn close(&self) {
        self.shutdown.trigger();
    }

    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.addrs.get().map(|a| a.http)
    }

    pub fn rpc_addr(&self) -> Option<SocketAddr> {
        self.addrs.get().map(|a| a.rpc)
    }

    /// Bound HTTP port, for pointing a client at this server.
    pub fn port_http(&self) -> Option<String> {
        self.http_addr().map(|a| a.port().to_string())
    }

    /// Bound RPC port, for pointing a client at this server.
    pub fn port_rpc(&self) -> Option<String> {
        self.rpc_addr().map(|a| a.port().to_string())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
