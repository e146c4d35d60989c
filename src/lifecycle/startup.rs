//! Startup orchestration.
//!
//! # Responsibilities
//! - Wire the interrupt listener to the shutdown coordinator
//! - Build the server around the registered routes
//! - Load TLS material, bind, serve, drain
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned, and the binary reports it
//!   through `LogSink::fatal`
//! - Listeners start last (traffic only when ready)

use crate::config::ServiceConfig;
use crate::fields;
use crate::http::server::{HttpServer, ServerError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::logging::{LogSink, SharedSink};
use crate::routing::Router;

/// Serve `routes` until SIGINT/SIGTERM, then drain and return.
pub async fn run(routes: Router, config: ServiceConfig, sink: SharedSink) -> Result<(), ServerError> {
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let interrupt = signals::trigger_on_interrupt(shutdown);

    tracing::debug!(routes = routes.len(), "starting server");
    let result = HttpServer::new(routes, config, sink).start(signal).await;

    interrupt.abort();
    result
}

/// Log a startup or shutdown failure and exit the process.
pub fn fatal(sink: &dyn LogSink, err: &ServerError) -> ! {
    sink.fatal(
        "server failed",
        &fields! { "error" => err.to_string() },
    )
}
