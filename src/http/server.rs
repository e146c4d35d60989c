//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum app around the route registry
//! - Wire up middleware (access log, tracing, panic isolation, timeout)
//! - Dispatch requests to registered handlers
//! - Serve plaintext HTTP/1.1, or TLS with HTTP/2 and HTTP/1.1 via ALPN
//! - Drain in-flight requests on shutdown within a bounded period

use std::any::Any;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::fields;
use crate::http::context::RequestContext;
use crate::http::middleware::access_log_middleware;
use crate::lifecycle::ShutdownSignal;
use crate::net::listener::{self, ListenError};
use crate::net::tls::{self, CertificateError};
use crate::observability::logging::SharedSink;
use crate::routing::{Resolution, Router as ServiceRouter};

/// Fatal server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Listen(#[from] ListenError),

    #[error("server forced to shutdown: in-flight requests did not drain within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Application state injected into the dispatcher.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ServiceRouter>,
    pub max_body_bytes: usize,
}

/// HTTP server for the registered routes.
pub struct HttpServer {
    app: Router,
    config: ServiceConfig,
    sink: SharedSink,
}

impl HttpServer {
    /// Create a new HTTP server; `routes` is frozen from here on.
    pub fn new(routes: ServiceRouter, config: ServiceConfig, sink: SharedSink) -> Self {
        let state = AppState {
            router: Arc::new(routes),
            max_body_bytes: config.limits.max_body_bytes,
        };
        let app = Self::build_router(&config, state, sink.clone());
        Self { app, config, sink }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState, sink: SharedSink) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(sink, access_log_middleware))
    }

    /// The complete handler chain, for in-process use.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Load TLS material, bind the configured address and serve until
    /// `shutdown` fires.
    pub async fn start(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let tls = tls::bootstrap(&self.config.tls.cert_dir)?;
        let listener = listener::bind(&self.config.bind_address()).await?;
        self.serve(listener, tls, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let tls = tls::bootstrap(&self.config.tls.cert_dir)?;
        self.serve(listener, tls, shutdown).await
    }

    async fn serve(
        self,
        listener: TcpListener,
        tls: Option<Arc<rustls::ServerConfig>>,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener::local_addr(&listener)?;
        let grace = self.config.timeouts.shutdown();
        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();

        self.sink.info(
            &format!("server started on port {}", addr.port()),
            &fields! {
                "address" => addr.to_string(),
                "pid" => std::process::id(),
                "tls" => tls.is_some(),
            },
        );

        let result = match tls {
            None => {
                self.sink.info("server started without TLS", &fields!());
                let serve = axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown.clone().cancelled())
                    .into_future();
                drain(serve, shutdown, grace, || {}).await
            }
            Some(config) => {
                let listener = listener.into_std().map_err(ListenError::Serve)?;
                let handle = axum_server::Handle::new();
                let serve = axum_server::from_tcp_rustls(listener, RustlsConfig::from_config(config))
                    .handle(handle.clone())
                    .serve(app);
                drain(serve, shutdown, grace, move || handle.graceful_shutdown(None)).await
            }
        };

        if result.is_ok() {
            self.sink.info("server exited", &fields!());
        }
        result
    }
}

/// Run `serve` until it fails or `shutdown` fires, then give in-flight
/// requests `grace` to finish.
async fn drain<S, F>(
    serve: S,
    shutdown: ShutdownSignal,
    grace: Duration,
    begin_shutdown: F,
) -> Result<(), ServerError>
where
    S: Future<Output = std::io::Result<()>>,
    F: FnOnce(),
{
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => {
            return result.map_err(|err| ListenError::Serve(err).into());
        }
        () = shutdown.cancelled() => {}
    }

    tracing::info!(grace = ?grace, "shutting down server");
    begin_shutdown();

    match tokio::time::timeout(grace, serve).await {
        Ok(result) => result.map_err(|err| ListenError::Serve(err).into()),
        Err(_) => Err(ServerError::ShutdownTimeout(grace)),
    }
}

/// Resolve the route, build the context and run the handler.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    match state.router.resolve(&parts.method, parts.uri.path()) {
        Resolution::NotFound => StatusCode::NOT_FOUND.into_response(),
        Resolution::MethodNotAllowed(allowed) => {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            response
        }
        Resolution::Matched { route, params } => {
            let body = axum::body::to_bytes(body, state.max_body_bytes)
                .await
                .map_err(|err| err.to_string());
            let mut ctx = RequestContext::from_parts(parts, body);
            ctx.bind_params(params);
            route.call(&mut ctx);
            ctx.into_response()
        }
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    tracing::error!(panic = %message, "handler panicked");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
