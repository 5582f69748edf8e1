//! Per-connection handshake and tunnel lifecycle.
//!
//! # Data Flow
//! ```text
//! AwaitingHandshake ─ read first buffer, extract headers, drain X-Split
//!     → Authorizing ─ AccessPolicy::check (reject: fixed response)
//!     → ConnectingTarget ─ resolve + dial (failure: silent close)
//!     → AckSent ─ 101 Switching Protocol
//!     → Relaying ─ relay::relay
//!     → Closed ─ both endpoints closed once, registry guard dropped by caller
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::TunnelConfig;
use crate::http::header::{find_header, X_PASS, X_REAL_HOST, X_SPLIT};
use crate::http::response;
use crate::net::connection::{CloseSignal, ConnectionId};
use crate::net::target::{self, ResolveError};
use crate::observability::metrics;
use crate::security::access_control::{AccessPolicy, Decision};
use crate::tunnel::endpoint::{Endpoint, Side, TunnelStream};
use crate::tunnel::relay::{relay, RelayError, RelayOptions};

/// Immutable settings shared by every handler.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub policy: AccessPolicy,
    /// Used when `X-Real-Host` is absent or empty.
    pub default_target: String,
    /// Capacity of the handshake read and of relay reads.
    pub read_size: usize,
    pub idle_timeout: Duration,
}

impl HandlerSettings {
    pub fn from_config(config: &TunnelConfig) -> Self {
        Self {
            policy: AccessPolicy::new(config.auth.password.clone()),
            default_target: config.target.default_host.clone(),
            read_size: config.buffers.read_size,
            idle_timeout: config.timeouts.idle(),
        }
    }

    fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            idle_timeout: self.idle_timeout,
            read_size: self.read_size,
        }
    }
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self::from_config(&TunnelConfig::default())
    }
}

/// Failures that end a connection without a client-visible response.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("client closed before completing the handshake")]
    EmptyHandshake,

    #[error("{0}")]
    Handshake(#[source] io::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to send response: {0}")]
    Respond(#[source] io::Error),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// How a connection ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Handshake refused with the decision's fixed response.
    Rejected(Decision),
    /// The server closed the connection.
    ClosedByServer,
}

/// Owns one client connection and, once dialed, its target.
pub struct ConnectionHandler<S> {
    id: ConnectionId,
    label: String,
    client: Endpoint<S>,
    target: Endpoint<TcpStream>,
    settings: Arc<HandlerSettings>,
    close: CloseSignal,
}

impl<S: TunnelStream> ConnectionHandler<S> {
    pub fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        client: S,
        close: CloseSignal,
        settings: Arc<HandlerSettings>,
    ) -> Self {
        Self {
            id,
            label: format!("Connection: {}", peer_addr),
            client: Endpoint::open(Side::Client, client),
            target: Endpoint::vacant(Side::Target),
            settings,
            close,
        }
    }

    /// Log label, extended with the target once one is chosen.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Serve the connection to completion, log the result and close.
    pub async fn handle(mut self) -> Result<Outcome, HandlerError> {
        let result = self.serve().await;

        match &result {
            Ok(Outcome::Rejected(decision)) => {
                tracing::info!(connection_id = %self.id, reason = decision.as_str(), "{} - rejected", self.label);
            }
            Ok(Outcome::ClosedByServer) => {
                tracing::debug!(connection_id = %self.id, "{} - closed by server", self.label);
            }
            Err(HandlerError::Relay(e @ (RelayError::Eof { .. } | RelayError::IdleTimeout))) => {
                tracing::info!(connection_id = %self.id, "{} - {}", self.label, e);
            }
            Err(HandlerError::Relay(e)) => {
                tracing::warn!(connection_id = %self.id, "{} - {}", self.label, e);
            }
            Err(e) => {
                tracing::info!(connection_id = %self.id, "{} - error: {}", self.label, e);
            }
        }

        self.close();
        result
    }

    /// Close both sockets. Returns how many this call actually closed.
    pub fn close(&mut self) -> usize {
        usize::from(self.client.close()) + usize::from(self.target.close())
    }

    async fn serve(&mut self) -> Result<Outcome, HandlerError> {
        let mut buf = vec![0u8; self.settings.read_size];

        let Some(n) = self.read_client(&mut buf).await? else {
            return Ok(Outcome::ClosedByServer);
        };
        let head = &buf[..n];

        let mut host = find_header(head, X_REAL_HOST);
        if host.is_empty() {
            host = self.settings.default_target.clone();
        }
        let pass = find_header(head, X_PASS);

        if !find_header(head, X_SPLIT).is_empty() {
            // Second fragment of a split request; discarded.
            if self.read_client(&mut buf).await?.is_none() {
                return Ok(Outcome::ClosedByServer);
            }
        }

        let decision = self.settings.policy.check(&host, &pass);
        if let Some(reply) = decision.response() {
            metrics::record_rejection(decision.as_str());
            if !self.send(reply).await? {
                return Ok(Outcome::ClosedByServer);
            }
            return Ok(Outcome::Rejected(decision));
        }

        self.label.push_str(" - CONNECT ");
        self.label.push_str(&host);

        let stream = tokio::select! {
            _ = self.close.closed() => return Ok(Outcome::ClosedByServer),
            stream = target::connect(&host) => stream?,
        };
        if self.target.attach(stream).is_err() {
            return Err(HandlerError::Handshake(io::Error::from(io::ErrorKind::AlreadyExists)));
        }

        if !self.send(response::SWITCHING_PROTOCOLS).await? {
            return Ok(Outcome::ClosedByServer);
        }
        tracing::info!(connection_id = %self.id, target_addr = %host, "{}", self.label);

        match relay(
            &mut self.client,
            &mut self.target,
            self.settings.relay_options(),
            &mut self.close,
        )
        .await
        {
            Ok(()) => Ok(Outcome::ClosedByServer),
            Err(e) => Err(e.into()),
        }
    }

    /// One bounded read from the client. `None` if the server closed first.
    async fn read_client(&mut self, buf: &mut [u8]) -> Result<Option<usize>, HandlerError> {
        let stream = self
            .client
            .stream_mut()
            .ok_or_else(|| HandlerError::Handshake(io::Error::from(io::ErrorKind::NotConnected)))?;

        tokio::select! {
            _ = self.close.closed() => Ok(None),
            read = stream.read(buf) => match read {
                Ok(0) => Err(HandlerError::EmptyHandshake),
                Ok(n) => Ok(Some(n)),
                Err(e) => Err(HandlerError::Handshake(e)),
            },
        }
    }

    /// Write a handshake response. `false` if the server closed first.
    async fn send(&mut self, bytes: &[u8]) -> Result<bool, HandlerError> {
        let stream = self
            .client
            .stream_mut()
            .ok_or_else(|| HandlerError::Respond(io::Error::from(io::ErrorKind::NotConnected)))?;

        tokio::select! {
            _ = self.close.closed() => Ok(false),
            written = stream.write_all(bytes) => written.map(|()| true).map_err(HandlerError::Respond),
        }
    }
}
