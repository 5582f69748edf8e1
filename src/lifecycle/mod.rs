//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse CLI → Load config → Validate → Init logging/metrics → Bind → Serve
//!
//! Shutdown:
//!     Signal received (signals.rs) → TunnelServer::close → Drain → Exit
//! ```
//!
//! # Design Decisions
//! - Bind failure is fatal and exits non-zero
//! - Shutdown has timeout: exit after the drain deadline regardless

pub mod signals;

pub use signals::shutdown_signal;
