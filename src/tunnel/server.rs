//! Tunnel server: accept loop, registry, shutdown.
//!
//! # Responsibilities
//! - Bind the listener and accept connections until closed
//! - Register every connection and spawn its handler
//! - On close: stop accepting, then force-close a snapshot of live connections
//!
//! # Design Decisions
//! - The registry lock is released before any connection is closed
//! - Registration is refused once closing starts, so no connection escapes the snapshot
//! - Accept errors while running are logged and skipped

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::config::{self, ConfigError, TunnelConfig};
use crate::net::connection::{ConnectionHandle, ConnectionRegistry};
use crate::net::listener::{Listener, ListenerError};
use crate::tunnel::handler::{ConnectionHandler, HandlerSettings};

/// Poll interval while waiting for connections to drain.
const DRAIN_POLL: Duration = Duration::from_millis(100);

/// The tunnel gateway.
///
/// Share it behind an `Arc` to call [`close`](Self::close) while
/// [`run`](Self::run) is in progress.
pub struct TunnelServer {
    config: TunnelConfig,
    settings: Arc<HandlerSettings>,
    registry: ConnectionRegistry,
    stop_tx: watch::Sender<bool>,
}

impl TunnelServer {
    /// Create a server from a normalized and validated `config`.
    ///
    /// An empty default target falls back to the built-in one.
    pub fn new(config: TunnelConfig) -> Result<Self, ConfigError> {
        let config = config::finalize(config)?;
        let settings = Arc::new(HandlerSettings::from_config(&config));
        let (stop_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            settings,
            registry: ConnectionRegistry::new(),
            stop_tx,
        })
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &TunnelConfig {
        &self.config
    }

    /// Bind and serve until [`close`](Self::close). Bind failure is fatal.
    pub async fn run(&self) -> Result<(), ListenerError> {
        let listener = Listener::bind(&self.config.listener).await?;
        self.serve(listener).await;
        Ok(())
    }

    /// Serve on an already-bound listener until [`close`](Self::close).
    ///
    /// The listener is dropped, closing the socket, when this returns.
    pub async fn serve(&self, listener: Listener) {
        self.registry.open();
        if self.is_stopping() {
            // close() ran before the registry opened.
            self.registry.shut();
            return;
        }

        let local = listener.local_addr().ok();
        tracing::info!(address = ?local, default_target = %self.settings.default_target, "Tunnel server starting");

        let mut stop_rx = self.stop_tx.subscribe();
        loop {
            let accepted = tokio::select! {
                _ = stopped(&mut stop_rx) => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer_addr)) => self.spawn_connection(stream, peer_addr),
                Err(_) if self.is_stopping() => break,
                Err(e) => tracing::warn!(error = %e, "Accept error"),
            }
        }

        drop(listener);
        tracing::info!("Tunnel server stopped");
    }

    fn spawn_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let (handle, signal) = ConnectionHandle::new(peer_addr);
        let id = handle.id();

        let Some(guard) = self.registry.register(handle) else {
            tracing::debug!(peer_addr = %peer_addr, "Server closing, dropping connection");
            return;
        };
        tracing::trace!(connection_id = %id, peer_addr = %peer_addr, "Connection registered");

        let handler = ConnectionHandler::new(id, peer_addr, stream, signal, Arc::clone(&self.settings));
        tokio::spawn(async move {
            let _ = handler.handle().await;
            drop(guard);
        });
    }

    /// Stop accepting and force-close every live connection. Idempotent.
    pub fn close(&self) {
        let first = !self.stop_tx.send_replace(true);
        let handles = self.registry.shut();

        if first {
            tracing::info!(active_connections = handles.len(), "Stopping server");
        }
        for handle in handles {
            if handle.close() {
                tracing::debug!(
                    connection_id = %handle.id(),
                    peer_addr = %handle.peer_addr(),
                    "Force-closing connection"
                );
            }
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_stopping(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Whether the accept loop is accepting registrations.
    pub fn is_running(&self) -> bool {
        self.registry.is_running()
    }

    /// Number of registered connections.
    pub fn active_connections(&self) -> usize {
        self.registry.len()
    }

    /// Wait until every connection has deregistered.
    pub async fn drained(&self) {
        while !self.registry.is_empty() {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    }
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopping| *stopping).await;
}
