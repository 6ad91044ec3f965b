//! Downstream transports.
//!
//! # Data Flow
//! ```text
//! Server handler with a Downstream target
//!     → http.rs  (POST JSON, trace context in HTTP headers)
//!     → rpc.rs   (newline-delimited JSON frame over TCP,
//!                 trace context in the frame's header map)
//!     → TraceResponse from the next hop
//! ```
//!
//! # Design Decisions
//! - Every downstream call is bounded by the configured request timeout
//! - One request per RPC connection; no pooling, no retries
//! - Failures are returned to the caller, which reports them upstream

pub mod http;
pub mod rpc;

use std::time::Duration;

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Errors calling a downstream service.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("downstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RPC I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RPC framing error: {0}")]
    Frame(#[from] LinesCodecError),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC error from downstream: {0}")]
    Remote(String),

    #[error("RPC connection closed before a reply was received")]
    NoReply,

    #[error("downstream call timed out after {0:?}")]
    Timeout(Duration),
}
