//! Request correlation id.
//!
//! # Responsibilities
//! - Name the `X-Request-Id` header shared by the access logger and handlers
//! - Generate fresh ids (UUID v4)
//! - Read the id back from a request or its parts

use axum::http::request::Parts;
use axum::http::{HeaderMap, Request};
use uuid::Uuid;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A new random correlation id.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Access to the correlation id of anything carrying request headers.
pub trait RequestIdExt {
    /// The `X-Request-Id` value, if present, valid and non-empty.
    fn request_id(&self) -> Option<&str>;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> Option<&str> {
        self.get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.headers().request_id()
    }
}

impl RequestIdExt for Parts {
    fn request_id(&self) -> Option<&str> {
        self.headers.request_id()
    }
}
