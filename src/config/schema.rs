//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tunnel.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Built-in default target used when none is configured.
pub const DEFAULT_TARGET: &str = "127.0.0.1:143";

/// Root configuration for the tunnel gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TunnelConfig {
    /// Listener configuration (bind address, port).
    pub listener: ListenerConfig,

    /// Shared-password settings.
    pub auth: AuthConfig,

    /// Target used when a client sends no `X-Real-Host`.
    pub target: TargetConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Read buffer sizing.
    pub buffers: BufferConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl TunnelConfig {
    /// Replace an empty default target with the built-in one.
    pub fn normalize(&mut self) {
        if self.target.default_host.trim().is_empty() {
            self.target.default_host = DEFAULT_TARGET.to_string();
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Listening port.
    pub port: u16,
}

impl ListenerConfig {
    /// `bind_address:port`, bracketing bare IPv6 literals.
    pub fn socket_address(&self) -> String {
        if self.bind_address.contains(':') && !self.bind_address.starts_with('[') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 80,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared password; empty disables password checks.
    pub password: String,
}

/// Default target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// `host:port` dialed when `X-Real-Host` is absent.
    pub default_host: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            default_host: DEFAULT_TARGET.to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Idle relay timeout in seconds.
    pub idle_secs: u64,
}

impl TimeoutConfig {
    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { idle_secs: 60 }
    }
}

/// Buffer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Capacity of the handshake read and of each relay read, in bytes.
    pub read_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            read_size: 4096 * 4,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
