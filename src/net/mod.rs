//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup
//!     → listener.rs (bind host:port)
//!     → tls.rs (look for certificates/, build rustls config)
//!     → plaintext HTTP/1.1, or TLS 1.3 with ALPN (h2, http/1.1)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional and decided once at startup
//! - Missing certificates degrade to plaintext; broken ones abort startup

pub mod listener;
pub mod tls;

pub use listener::ListenError;
pub use tls::{CertificateError, TlsMaterial};
