//! Access Log Middleware.
//! Assigns the correlation id and writes one line per request.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::fields;
use crate::http::request::{generate_request_id, RequestIdExt, X_REQUEST_ID};
use crate::observability::logging::SharedSink;

/// Wraps the whole request: reuses or generates `X-Request-Id`, runs the
/// inner service, echoes the id on the response and logs the outcome at
/// info level.
pub async fn access_log_middleware(
    State(sink): State<SharedSink>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();

    let request_id = match req.request_id() {
        Some(id) => id.to_owned(),
        None => {
            let id = generate_request_id();
            if let Ok(value) = HeaderValue::from_str(&id) {
                req.headers_mut().insert(X_REQUEST_ID, value);
            }
            id
        }
    };

    let method = req.method().to_string();
    let request_uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| req.uri().to_string());
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    let mut response = next.run(req).await;

    if response.headers().request_id().is_none() {
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
    }

    let duration = start.elapsed();
    sink.info(
        "Request",
        &fields! {
            "method" => method,
            "requestURI" => request_uri,
            "remoteAddr" => remote_addr,
            "status" => response.status().as_u16(),
            "duration" => format!("{duration:?}"),
            "sessionId" => request_id,
        },
    );

    response
}
