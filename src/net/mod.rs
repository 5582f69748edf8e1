//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → connection.rs (ID, registry entry, close trigger)
//!     → Hand off to tunnel handler
//!
//! Outbound:
//!     target.rs (host[:port] → dialed TcpStream)
//! ```
//!
//! # Design Decisions
//! - No connection cap: every accepted connection is served
//! - Each connection tracked for forced shutdown
//! - Dialing uses OS connect defaults, no extra timeout

pub mod connection;
pub mod listener;
pub mod target;

pub use connection::{CloseSignal, ConnectionHandle, ConnectionId, ConnectionRegistry, RegistryGuard};
pub use listener::{Listener, ListenerError};
pub use target::{ResolveError, Target};
