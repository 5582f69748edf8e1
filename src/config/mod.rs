//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI flag overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → TunnelConfig (validated, immutable)
//!     → shared via Arc to every connection
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{finalize, load_config, read_config, ConfigError};
pub use schema::{
    AuthConfig, BufferConfig, ListenerConfig, ObservabilityConfig, TargetConfig, TimeoutConfig,
    TunnelConfig, DEFAULT_TARGET,
};
pub use validation::ValidationError;
