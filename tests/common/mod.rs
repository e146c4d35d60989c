//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

use svcmux::observability::MemorySink;
use svcmux::{HttpServer, Router, ServiceConfig};

#[derive(Debug, Deserialize)]
pub struct Greeting {
    pub name: String,
}

/// Routes mirroring the demo binary plus a few probes.
pub fn demo_routes() -> Router {
    let mut router = Router::new();
    router.get("/hello/{id}", |c| {
        let id = c.param("id");
        c.json(StatusCode::OK, &format!("Hello, World!{id}"));
    });
    router.get("/hello", |c| {
        let name = c.query("name");
        c.json(StatusCode::OK, &format!("Hello, World! {name}"));
    });
    router.post("/hello", |c| match c.bind::<Greeting>() {
        Ok(data) => c.json(
            StatusCode::OK,
            &json!({ "message": format!("Hello, {}!", data.name) }),
        ),
        Err(err) => c.json(StatusCode::BAD_REQUEST, &err.to_string()),
    });
    router.get("/message", |c| {
        c.json(StatusCode::OK, &json!({ "message": "Hello, World" }));
    });
    router.patch("/items/{id}", |c| {
        let id = c.param("id");
        c.json(StatusCode::OK, &json!({ "patched": id }));
    });
    router.get("/session", |c| {
        let session = c.session().to_owned();
        c.json(StatusCode::OK, &session);
    });
    router.put("/echo/{name}", |c| {
        let client = c.header("x-client").unwrap_or("anonymous").to_owned();
        let method = c.method().to_string();
        let path = c.uri().path().to_owned();
        let name = c.param("name");
        c.set_header(
            HeaderName::from_static("x-served-by"),
            HeaderValue::from_static("svcmux"),
        );
        c.json(
            StatusCode::ACCEPTED,
            &json!({ "client": client, "method": method, "path": path, "name": name }),
        );
    });
    router.get("/silent", |_| {});
    router.get("/panic", |_| panic!("handler blew up"));
    router
}

/// Config pointing at an empty certificate directory, so the server runs
/// without TLS, on an ephemeral port.
pub fn plain_config(cert_dir: &Path) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.tls.cert_dir = cert_dir.to_path_buf();
    config.timeouts.shutdown_secs = 5;
    config
}

/// A server over [`demo_routes`] logging into memory.
pub fn test_server() -> (HttpServer, Arc<MemorySink>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let server = HttpServer::new(demo_routes(), plain_config(dir.path()), sink.clone());
    (server, sink, dir)
}

/// Send one request through the in-process handler chain.
pub async fn send(server: &HttpServer, request: Request<Body>) -> Response<Body> {
    server.app().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Write a self-signed certificate for `localhost` into `dir`.
pub fn write_self_signed(dir: &Path) {
    let rcgen::CertifiedKey { cert, signing_key } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    std::fs::write(dir.join("cert.pem"), cert.pem()).unwrap();
    std::fs::write(dir.join("key.pem"), signing_key.serialize_pem()).unwrap();
}
