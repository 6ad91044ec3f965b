//! Behavior client: the endpoint the orchestrator drives.
//!
//! # Data Flow
//! ```text
//! Orchestrator GET /?behavior=trace&sampled=true&s1name=...
//!     → handler.rs (HEAD short-circuit, params, run, JSON encode)
//!     → Dispatcher::dispatch (behavior switch)
//!     → trace.rs (POST /start_trace to S1, validate the response chain)
//!     → entries back as a JSON array
//! ```
//!
//! # Design Decisions
//! - Configuration and host mapper are fixed at construction
//! - Each Client owns its router; nothing is registered process-wide
//! - The socket is bound before `async_start` returns, so early
//!   connections wait in the backlog instead of being refused

pub mod handler;
pub mod trace;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{ClientConfig, TimeoutConfig};
use crate::lifecycle::Shutdown;
use crate::net::{self, ListenerError};
use crate::transport;

/// Remaps a service name to a network host.
pub type HostMapper = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Errors from the client lifecycle.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("client is already listening")]
    AlreadyListening,

    #[error("client is not listening")]
    NotListening,

    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Immutable per-client state shared with request handlers.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    config: ClientConfig,
    host_mapper: Option<HostMapper>,
    http: reqwest::Client,
}

impl Dispatcher {
    fn new(config: ClientConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            config,
            host_mapper: None,
            http: transport::http::build_client(
                Duration::from_secs(timeouts.connect_secs),
                Duration::from_secs(timeouts.request_secs),
            ),
        }
    }

    pub(crate) fn map_service_to_host(&self, service: &str) -> String {
        match &self.host_mapper {
            Some(mapper) => mapper(service),
            None => service.to_string(),
        }
    }
}

/// Controller for the behavior endpoint.
pub struct Client {
    dispatcher: Arc<Dispatcher>,
    listener: Mutex<Option<TcpListener>>,
    local_addr: OnceLock<SocketAddr>,
    shutdown: Shutdown,
}

impl Client {
    /// Create a client; blank config fields get their defaults.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_timeouts(config, &TimeoutConfig::default())
    }

    pub fn with_timeouts(config: ClientConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(config.with_defaults(), timeouts)),
            listener: Mutex::new(None),
            local_addr: OnceLock::new(),
            shutdown: Shutdown::new(),
        }
    }

    /// Install a service-name → host mapper.
    pub fn with_host_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.dispatcher).host_mapper = Some(Arc::new(mapper));
        self
    }

    /// Effective configuration, defaults applied.
    pub fn config(&self) -> &ClientConfig {
        &self.dispatcher.config
    }

    /// Bind the listening socket.
    pub async fn listen(&self) -> Result<SocketAddr, ClientError> {
        if self.local_addr.get().is_some() {
            return Err(ClientError::AlreadyListening);
        }

        let (listener, addr) = net::bind(&self.dispatcher.config.host_port).await?;
        self.local_addr
            .set(addr)
            .map_err(|_| ClientError::AlreadyListening)?;
        *self.slot() = Some(listener);

        tracing::info!(
            address = %addr,
            server_port_http = %self.dispatcher.config.server_port_http,
            server_port_rpc = %self.dispatcher.config.server_port_rpc,
            "Crossdock client listening"
        );
        Ok(addr)
    }

    /// Serve behavior requests until [`Client::close`] is called.
    pub async fn serve(&self) -> Result<(), ClientError> {
        if self.shutdown.is_triggered() {
            return Ok(());
        }
        let listener = self.slot().take().ok_or(ClientError::NotListening)?;
        serve_listener(listener, self.dispatcher.clone(), self.shutdown.clone()).await
    }

    /// Listen, then serve until closed. Bind failures are returned.
    pub async fn start(&self) -> Result<(), ClientError> {
        self.listen().await?;
        self.serve().await
    }

    /// Listen, then serve on a background task.
    pub async fn async_start(&self) -> Result<JoinHandle<Result<(), ClientError>>, ClientError> {
        self.listen().await?;
        let listener = self.slot().take().ok_or(ClientError::NotListening)?;
        Ok(tokio::spawn(serve_listener(
            listener,
            self.dispatcher.clone(),
            self.shutdown.clone(),
        )))
    }

    /// Stop serving and release the socket. Safe to call more than once.
    pub fn close(&self) {
        self.shutdown.trigger();
        self.slot().take();
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Base URL of the behavior endpoint once bound.
    pub fn url(&self) -> Option<String> {
        self.local_addr().map(|addr| format!("http://{}/", addr))
    }

    pub fn map_service_to_host(&self, service: &str) -> String {
        self.dispatcher.map_service_to_host(service)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<TcpListener>> {
        self.listener.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn serve_listener(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    shutdown: Shutdown,
) -> Result<(), ClientError> {
    let app = handler::build_router(dispatcher);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.wait())
        .await
        .map_err(ClientError::Serve)?;

    tracing::info!("Crossdock client stopped");
    Ok(())
}
