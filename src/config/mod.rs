//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (PORT, LOG_LEVEL, LOG_FORMAT)
//!     → loader.rs (read & parse)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to the server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so an empty environment is a valid config
//! - Validation separates syntactic (parsing) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::ServiceConfig;
pub use schema::{LimitsConfig, ListenerConfig, LoggingConfig, TimeoutConfig, TlsConfig};
