//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, protocol negotiation)
//!     → middleware/access_log.rs (X-Request-Id, timing, access line)
//!     → server.rs dispatch (routing layer resolves template + params)
//!     → context.rs (handler reads query/params/body, writes JSON)
//!     → Send to client
//! ```

pub mod context;
pub mod middleware;
pub mod request;
pub mod server;

pub use context::{DecodeError, RequestContext, JSON_CONTENT_TYPE};
pub use request::{generate_request_id, RequestIdExt, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
