//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every subsystem produces:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
