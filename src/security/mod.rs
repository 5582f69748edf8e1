//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed handshake (target, X-Pass):
//!     → access_control.rs (password / loopback policy)
//!     → Allow: dial target
//!     → Reject: fixed response, close
//! ```
//!
//! # Design Decisions
//! - Policy is immutable after construction
//! - Without a password, only loopback targets are reachable
//! - No connection-rate limiting or admission control

pub mod access_control;

pub use access_control::{AccessPolicy, Decision};
