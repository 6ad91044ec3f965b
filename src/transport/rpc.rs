//! Framed JSON RPC over TCP.
//!
//! # Responsibilities
//! - Define request/reply frames (one JSON document per line)
//! - Accept loop that answers one request per connection
//! - Client call with connect and request timeouts
//!
//! # Design Decisions
//! - Lines are framed by `LinesCodec`, capped at `MAX_FRAME_BYTES`
//! - A peer that sends no request within the read timeout is dropped
//! - The accept loop exits on shutdown; in-flight connections finish alone

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};

use crate::lifecycle::Shutdown;
use crate::transport::DownstreamError;

/// Upper bound on a single frame.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

type FramedStream = Framed<TcpStream, LinesCodec>;

/// Request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

/// Reply frame: exactly one of `body` or `error` is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            body: Some(body),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            body: None,
            error: Some(message.into()),
        }
    }
}

/// Server-side handler for inbound RPC requests.
pub trait RpcHandler: Send + Sync + 'static {
    fn handle(&self, request: RpcRequest) -> impl Future<Output = RpcResponse> + Send;
}

/// Accept RPC connections until `shutdown` triggers.
///
/// Each connection must deliver its request frame within `read_timeout`.
pub async fn serve<H: RpcHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    shutdown: Shutdown,
    read_timeout: Duration,
) {
    let stopped = shutdown.wait();
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, handler, read_timeout).await {
                                tracing::warn!(peer = %peer, error = %e, "RPC connection failed");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "RPC accept failed");
                    }
                }
            }
            _ = &mut stopped => {
                tracing::info!("RPC server stopped");
                break;
            }
        }
    }
}

fn framed(stream: TcpStream) -> FramedStream {
    Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_BYTES))
}

async fn handle_connection<H: RpcHandler>(
    stream: TcpStream,
    handler: Arc<H>,
    read_timeout: Duration,
) -> Result<(), DownstreamError> {
    let mut frames = framed(stream);
    let line = tokio::time::timeout(read_timeout, read_frame(&mut frames))
        .await
        .map_err(|_| DownstreamError::Timeout(read_timeout))??;

    let response = match serde_json::from_str::<RpcRequest>(&line) {
        Ok(request) => {
            tracing::debug!(method = %request.method, "RPC request");
            handler.handle(request).await
        }
        Err(e) => RpcResponse::error(format!("malformed request frame: {}", e)),
    };

    write_frame(&mut frames, &response).await?;
    frames.get_mut().shutdown().await?;
    Ok(())
}

/// Call `method` on the RPC server at `addr` and decode the reply body.
pub async fn call<Req, Resp>(
    addr: &str,
    method: &str,
    headers: HashMap<String, String>,
    body: &Req,
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Resp, DownstreamError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    tracing::debug!(addr = %addr, method = %method, "RPC downstream");

    let request = RpcRequest {
        method: method.to_string(),
        headers,
        body: serde_json::to_value(body)?,
    };

    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| DownstreamError::Timeout(connect_timeout))??;

    let exchange = async move {
        let mut frames = framed(stream);
        write_frame(&mut frames, &request).await?;
        let line = read_frame(&mut frames).await?;
        let response: RpcResponse = serde_json::from_str(&line)?;
        match (response.error, response.body) {
            (Some(error), _) => Err(DownstreamError::Remote(error)),
            (None, Some(body)) => Ok(serde_json::from_value(body)?),
            (None, None) => Err(DownstreamError::NoReply),
        }
    };

    tokio::time::timeout(request_timeout, exchange)
        .await
        .map_err(|_| DownstreamError::Timeout(request_timeout))?
}

async fn read_frame(frames: &mut FramedStream) -> Result<String, DownstreamError> {
    match frames.next().await {
        Some(line) => Ok(line?),
        None => Err(DownstreamError::NoReply),
    }
}

async fn write_frame<T: Serialize>(frames: &mut FramedStream, frame: &T) -> Result<(), DownstreamError> {
    frames.send(serde_json::to_string(frame)?).await?;
    Ok(())
}
