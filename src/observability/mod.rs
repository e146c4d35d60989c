//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Access logger, lifecycle events:
//!     → LogSink (leveled message + field map)
//!     → TracingSink → tracing subscriber (text or JSON on stdout)
//!
//! Internal diagnostics:
//!     → tracing macros directly
//! ```
//!
//! # Design Decisions
//! - Structured fields for machine parsing
//! - Request ID appears on every access line
//! - Sink chosen explicitly at startup

pub mod logging;

pub use logging::{
    init_logging, Fields, LogEntry, LogFormat, LogSink, MemorySink, Severity, SharedSink,
    TracingSink,
};
