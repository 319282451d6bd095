//! Middleware layer.
//!
//! Middleware wraps a [`Handler`](crate::Handler) and is itself a handler, so
//! layers nest by construction:
//!
//! ```rust,no_run
//! use httplog::{handler_fn, middleware::WithLogging, Server};
//!
//! # async fn run() -> Result<(), httplog::Error> {
//! let app = handler_fn(|w, _req| Box::pin(async move {
//!     let _ = w.write(b"ok");
//! }));
//!
//! Server::bind("0.0.0.0:3000").serve(WithLogging::new(app)).await
//! # }
//! ```
//!
//! Built-in middleware:
//! - [`WithLogging`]: one access-log entry per request with verb, URI,
//!   latency, status, and whatever handler code attached along the way

mod logging;

pub use logging::WithLogging;
