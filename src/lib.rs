//! TCP tunnel gateway behind a pseudo-HTTP upgrade handshake.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod tunnel;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::TunnelConfig;
pub use tunnel::TunnelServer;
