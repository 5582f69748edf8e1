//! Pseudo-HTTP handshake vocabulary.
//!
//! # Data Flow
//! ```text
//! First client read (raw bytes)
//!     → header.rs (X-Real-Host, X-Pass, X-Split)
//!     → security::access_control (decision)
//!     → response.rs (fixed literal written back)
//! ```
//!
//! # Design Decisions
//! - No HTTP stack: method, path and version are never inspected
//! - Responses are byte literals

pub mod header;
pub mod response;

pub use header::find_header;
