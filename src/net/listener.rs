//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured address and port
//! - Accept incoming TCP connections
//! - Separate bind errors (fatal) from accept errors (transient)

use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind { address: String, source: std::io::Error },
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { address, source } => {
                write!(f, "failed to start server on {}: {}", address, source)
            }
            ListenerError::Accept(e) => write!(f, "accept error: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
            ListenerError::Accept(e) => Some(e),
        }
    }
}

/// The tunnel's listening socket.
///
/// Dropping it closes the socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to `bind_address:port`.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let address = config.socket_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.clone(),
                source,
            })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { address, source })?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self { inner: listener })
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer_addr = %addr, error = %e, "Failed to set nodelay");
        }

        tracing::debug!(peer_addr = %addr, "Connection accepted");
        Ok((stream, addr))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback(port: u16) -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1".to_string(),
            port,
        }
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let listener = Listener::bind(&loopback(0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (_stream, peer) = listener.accept().await.unwrap();
        let client = client.await.unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn bind_conflict_is_bind_error() {
        let first = Listener::bind(&loopback(0)).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let err = Listener::bind(&loopback(port)).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
        assert!(err.to_string().contains(&format!("127.0.0.1:{}", port)));
    }
}
