//! svcmux demo service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────────▶ net (plain TCP or TLS 1.3 + ALPN)
//!                          │
//!                          ▼
//!                        access log (X-Request-Id, timing)
//!                          │
//!                          ▼
//!                        routing (template match, params)
//!                          │
//!                          ▼
//!                        handler(&mut RequestContext)
//!                          │
//!     Client Response      ▼
//!     ◀───────────────── JSON body
//! ```
//!
//! Reads `PORT`, `LOG_LEVEL` and `LOG_FORMAT` from the environment. Serves
//! TLS when `certificates/cert.pem` and `certificates/key.pem` exist.

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use svcmux::config::loader;
use svcmux::lifecycle::startup;
use svcmux::observability::{init_logging, TracingSink};
use svcmux::Router;

#[derive(Debug, Deserialize)]
struct Greeting {
    name: String,
}

#[tokio::main]
async fn main() {
    let config = match loader::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    init_logging(&config.logging);

    tracing::info!("svcmux v{} starting", env!("CARGO_PKG_VERSION"));

    let mut router = Router::new();
    router.get("/hello/{id}", |c| {
        let id = c.param("id");
        c.json(StatusCode::OK, &format!("Hello, World!{id}"));
    });
    router.get("/hello", |c| {
        tracing::debug!(session = c.session(), "greeting");
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

    let sink = Arc::new(TracingSink);
    if let Err(err) = startup::run(router, config, sink.clone()).await {
        startup::fatal(sink.as_ref(), &err);
    }
}
