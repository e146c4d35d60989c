//! Minimal HTTP request router with per-request context, structured access
//! logging and optional TLS/HTTP2 termination.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::ServiceConfig;
pub use http::{DecodeError, HttpServer, RequestContext, ServerError};
pub use lifecycle::Shutdown;
pub use routing::Router;
