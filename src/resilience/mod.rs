//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Relaying connection:
//!     → every forwarded chunk touches the idle timer (timeouts.rs)
//!     → watchdog task polls the timer
//!     → expiry becomes a relay error event, ending the connection
//! ```
//!
//! # Design Decisions
//! - Idle timeout is the only autonomous cancellation source
//! - No retries: every failure is terminal for its connection

pub mod timeouts;

pub use timeouts::{IdleTimer, IDLE_TIMEOUT};
