//! Target resolution and dialing.
//!
//! # Responsibilities
//! - Split `host` or `host:port` on the first ':'
//! - Default the port to 443 when none is given
//! - Dial the local machine when the host is empty
//! - Dial the target with the platform's default connect behavior

use std::fmt;
use tokio::net::TcpStream;

/// Port used when the target carries no `:port` suffix.
pub const DEFAULT_PORT: u16 = 443;

/// Dialed in place of an empty host (`:port`).
const LOCAL_HOST: &str = "127.0.0.1";

/// Error type for target resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The text after ':' is not a port number.
    #[error("invalid port format: {0:?}")]
    InvalidPort(String),

    /// The TCP connect failed.
    #[error("failed to connect to target {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

/// A concrete dial target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    /// Parse `host` or `host:port`.
    pub fn parse(host_port: &str) -> Result<Self, ResolveError> {
        match host_port.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ResolveError::InvalidPort(port.to_string()))?;
                Ok(Self {
                    host: host.to_string(),
                    port,
                })
            }
            None => Ok(Self {
                host: host_port.to_string(),
                port: DEFAULT_PORT,
            }),
        }
    }

    /// Host actually dialed; an empty host means the local machine.
    pub fn dial_host(&self) -> &str {
        if self.host.is_empty() {
            LOCAL_HOST
        } else {
            &self.host
        }
    }

    /// Open a TCP connection to this target.
    pub async fn dial(&self) -> Result<TcpStream, ResolveError> {
        let stream = TcpStream::connect((self.dial_host(), self.port))
            .await
            .map_err(|source| ResolveError::Dial {
                target: self.to_string(),
                source,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(target_addr = %self, error = %e, "Failed to set nodelay");
        }

        Ok(stream)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Resolve and dial `host_port` in one step.
pub async fn connect(host_port: &str) -> Result<TcpStream, ResolveError> {
    Target::parse(host_port)?.dial().await
}
