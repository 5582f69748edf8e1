//! Tunnel subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs (accept loop)
//!     → register ConnectionHandle, spawn task
//!     → handler.rs (handshake, policy, dial, ack)
//!     → relay.rs (client ⇄ target until error, idle timeout or close)
//!     → endpoint.rs closes both sockets once
//!     → registry guard dropped (deregistered)
//! ```
//!
//! # Design Decisions
//! - One task per connection, two reader tasks and one watchdog while relaying
//! - Sockets are owned by exactly one handler
//! - Forced close is a signal; the owning handler closes its own sockets

pub mod endpoint;
pub mod handler;
pub mod relay;
pub mod server;

pub use handler::{ConnectionHandler, HandlerError, HandlerSettings, Outcome};
pub use relay::{RelayError, RelayOptions};
pub use server::TunnelServer;
