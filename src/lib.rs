//! # httplog
//!
//! Per-request HTTP access logging for Rust services behind a reverse proxy.
//!
//! ## The contract
//!
//! One request, one log line. [`WithLogging`](middleware::WithLogging) wraps
//! a [`Handler`] and records what the handler did to the response: the first
//! status it wrote, how long it took, whether it took over the connection,
//! and anything the handler chose to add along the way.
//!
//! The wrapped writer never claims more than the real one can do. If the
//! server's writer can flush, so can the logged one; if it cannot be
//! hijacked, neither can the logged one. Handlers that probe for
//! capabilities keep working unchanged behind the logging layer.
//!
//! What the entry carries:
//!
//! - **verb**, **URI**, **latency**, **userAgent**, **audit-ID**, **srcIP**
//! - key/value pairs added with [`add_key_value`]
//! - the response status, or `hijacked=true`
//! - free-form notes added with [`add_info`]
//! - a stack trace captured at the status write, when the predicate asks for one
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use httplog::{handler_fn, middleware::WithLogging, add_key_value, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = handler_fn(|w, req| Box::pin(async move {
//!         add_key_value(req.extensions(), "tenant", "acme");
//!         w.write_header(201);
//!         let _ = w.write(b"created");
//!     }));
//!
//!     Server::bind("0.0.0.0:3000")
//!         .serve(WithLogging::new(app))
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! Entries are emitted as `tracing` events on the `httplog` target at
//! `DEBUG`, so `RUST_LOG=httplog=debug` turns them on.

mod context;
mod error;
mod handler;
mod logger;
mod predicate;
mod record;
mod request;
mod response;
mod server;
mod verb;
mod wrap;
mod writer;

pub mod middleware;

pub use context::{
    LogHandle, Logger, PassthroughLogger, add_info, add_key_value, attach, log_of, lookup,
    unlogged,
};
pub use error::Error;
pub use handler::{BoxFuture, Handler, handler_fn};
pub use logger::RespLogger;
pub use predicate::{StacktracePred, default_stacktrace_pred, status_is_not};
pub use record::{LogRecord, LogSink, TARGET, TracingSink, Value};
pub use request::{
    AuditId, ReceivedTimestamp, RemoteAddr, Request, RequestInfo, RequestMeta,
    audit_id_truncated, received_timestamp,
};
pub use response::HttpResponseWriter;
pub use server::Server;
pub use verb::{APPLY_PATCH_CONTENT_TYPE, StandardVerbs, VerbResolver};
pub use wrap::{LoggedWriter, Shape, wrap};
pub use writer::{CloseNotifier, Connection, Flusher, Hijacked, Hijacker, ResponseWriter};
