//! Route registry and lookup.
//!
//! # Responsibilities
//! - Store (method, template, handler) triples
//! - Resolve an incoming method and path to a route plus extracted parameters
//! - Report explicit no-match / wrong-method outcomes
//!
//! # Design Decisions
//! - Mutable while building, then moved into the server and shared read-only
//!   (registration after start is impossible by construction)
//! - Re-registering the same (method, template) replaces the handler in place
//! - Every method resolves parameters the same way
//! - Most literal segments wins; ties go to the earliest registration
//! - `HEAD` falls back to the matching `GET` route

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::config::ServiceConfig;
use crate::http::context::RequestContext;
use crate::http::server::ServerError;
use crate::routing::matcher::{Params, PathTemplate};

/// A request handler. Runs synchronously on the connection's task.
pub type HandlerFn = Arc<dyn Fn(&mut RequestContext) + Send + Sync>;

/// One registered route.
#[derive(Clone)]
pub struct Route {
    method: Method,
    template: PathTemplate,
    handler: HandlerFn,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Invoke the handler.
    pub fn call(&self, ctx: &mut RequestContext) {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template.raw())
            .finish_non_exhaustive()
    }
}

/// Outcome of looking up a request.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A route matched; `params` holds every captured placeholder.
    Matched { route: &'a Route, params: Params },
    /// The path matches routes, but only for these other methods.
    MethodNotAllowed(Vec<Method>),
    /// Nothing matches the path.
    NotFound,
}

/// The method + path → handler registry.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` and the template `path`.
    pub fn handle<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        let route = Route {
            method,
            template: PathTemplate::parse(path),
            handler: Arc::new(handler),
        };

        match self
            .routes
            .iter_mut()
            .find(|r| r.method == route.method && r.template.raw() == path)
        {
            Some(existing) => {
                tracing::debug!(method = %route.method, path, "replacing route");
                *existing = route;
            }
            None => self.routes.push(route),
        }
        self
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        self.handle(Method::GET, path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        self.handle(Method::POST, path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        self.handle(Method::PUT, path, handler)
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        self.handle(Method::PATCH, path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        self.handle(Method::DELETE, path, handler)
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route for `method` and `path`.
    ///
    /// A `HEAD` request without a `HEAD` route of its own is served by the
    /// matching `GET` route.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let mut best: Option<(&Route, Params)> = None;
        let mut allowed = Vec::new();

        for route in &self.routes {
            let Some(params) = route.template.matches(path) else {
                continue;
            };
            if !serves(&route.method, method) {
                for m in allowed_for(&route.method) {
                    if !allowed.contains(&m) {
                        allowed.push(m);
                    }
                }
                continue;
            }
            let better = best.as_ref().map_or(true, |(current, _)| {
                let (new, old) = (route.template.specificity(), current.template.specificity());
                new > old || (new == old && route.method == *method && current.method != *method)
            });
            if better {
                best = Some((route, params));
            }
        }

        match best {
            Some((route, params)) => Resolution::Matched { route, params },
            None if !allowed.is_empty() => Resolution::MethodNotAllowed(allowed),
            None => Resolution::NotFound,
        }
    }

    /// Serve these routes until an interrupt arrives.
    ///
    /// Picks TLS when certificate material is present, logs through the
    /// tracing-backed sink and drains in-flight requests on shutdown.
    pub async fn start(self, config: ServiceConfig) -> Result<(), ServerError> {
        crate::lifecycle::startup::run(self, config, Arc::new(crate::observability::TracingSink))
            .await
    }
}

fn serves(registered: &Method, requested: &Method) -> bool {
    registered == requested || (*requested == Method::HEAD && *registered == Method::GET)
}

fn allowed_for(registered: &Method) -> Vec<Method> {
    if *registered == Method::GET {
        vec![Method::GET, Method::HEAD]
    } else {
        vec![registered.clone()]
    }
}
