//! TCP listener binding.
//!
//! # Responsibilities
//! - Normalize `host:port` strings (a bare `:port` binds all interfaces)
//! - Bind to the configured address, resolving host names
//! - Report the address actually bound (port 0 → OS-assigned)

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Expand a host-less `:port` into a wildcard address.
pub fn normalize_host_port(host_port: &str) -> String {
    if host_port.starts_with(':') {
        format!("0.0.0.0{}", host_port)
    } else {
        host_port.to_string()
    }
}

/// Bind a TCP listener on `host_port`.
pub async fn bind(host_port: &str) -> Result<(TcpListener, SocketAddr), ListenerError> {
    let address = normalize_host_port(host_port);
    let bind_error = |source| ListenerError::Bind {
        address: address.clone(),
        source,
    };

    let listener = TcpListener::bind(address.as_str()).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    tracing::info!(address = %local_addr, "Listener bound");

    Ok((listener, local_addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host_port() {
        assert_eq!(normalize_host_port(":8080"), "0.0.0.0:8080");
        assert_eq!(normalize_host_port("127.0.0.1:0"), "127.0.0.1:0");
        assert_eq!(normalize_host_port("localhost:9"), "localhost:9");
    }

    #[tokio::test]
    async fn test_bind_os_assigned_port() {
        let (_listener, addr) = bind("127.0.0.1:0").await.unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let (_held, addr) = bind("127.0.0.1:0").await.unwrap();
        let err = bind(&addr.to_string()).await.unwrap_err();
        assert!(err.to_string().starts_with(&format!("Failed to bind {}", addr)));
    }
}
