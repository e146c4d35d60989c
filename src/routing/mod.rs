//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before start):
//!     router.get("/hello/{id}", handler)
//!     → matcher.rs parses the template into segments
//!     → router.rs stores (method, template, handler)
//!
//! Incoming Request (method, path)
//!     → router.rs (scan routes)
//!     → matcher.rs (positional segment comparison, parameter capture)
//!     → Return: Matched { route, params } | MethodNotAllowed | NotFound
//! ```
//!
//! # Design Decisions
//! - Routes frozen at startup, immutable at runtime
//! - No regex and no wildcards
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::{Params, PathTemplate, Segment};
pub use router::{HandlerFn, Resolution, Route, Router};
