//! Finding a request's [`RespLogger`] from anywhere the request travels.
//!
//! The logger is stored in the request's [`Extensions`], so handler code and
//! nested middleware can annotate the access-log entry without being handed
//! the logger explicitly.
//!
//! ```rust
//! use httplog::{add_info, add_key_value};
//!
//! fn authorize(req: &httplog::Request) {
//!     add_key_value(req.extensions(), "user", "alice");
//!     add_info(req.extensions(), format_args!("authorized by rule {}", 7));
//! }
//! ```

use std::fmt;

use http::Extensions;

use crate::logger::RespLogger;
use crate::record::{TARGET, Value};
use crate::writer::ResponseWriter;

/// Something that accepts free-text annotations for a request.
pub trait Logger {
    fn addf(&self, args: fmt::Arguments<'_>);
}

impl Logger for RespLogger {
    fn addf(&self, args: fmt::Arguments<'_>) {
        RespLogger::addf(self, args);
    }
}

/// Logs each annotation immediately; used when no [`RespLogger`] is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughLogger;

impl Logger for PassthroughLogger {
    fn addf(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: TARGET, "{args}");
    }
}

/// What [`log_of`] hands back.
#[derive(Clone, Debug)]
pub enum LogHandle {
    Request(RespLogger),
    Passthrough(PassthroughLogger),
}

impl Logger for LogHandle {
    fn addf(&self, args: fmt::Arguments<'_>) {
        match self {
            Self::Request(rl) => rl.addf(args),
            Self::Passthrough(pl) => pl.addf(args),
        }
    }
}

// ── Attach / lookup ───────────────────────────────────────────────────────────

/// Binds `logger` to `req`.
///
/// # Panics
///
/// Panics if `req` already carries a logger: two logging layers on one
/// request means the middleware stack is assembled wrong.
pub fn attach<B>(mut req: http::Request<B>, logger: RespLogger) -> http::Request<B> {
    if req.extensions().get::<RespLogger>().is_some() {
        panic!("multiple WithLogging layers installed on one request");
    }
    req.extensions_mut().insert(logger);
    req
}

pub fn lookup(extensions: &Extensions) -> Option<RespLogger> {
    extensions.get::<RespLogger>().cloned()
}

/// The writer underneath the logging decorator, or `w` itself when the
/// request is not being logged.
///
/// Use this to hand the raw writer to code that must bypass instrumentation.
///
/// `w` must be the writer [`WithLogging`](crate::middleware::WithLogging)
/// handed to the handler. Exactly one decorator layer is removed, so if
/// another decorator sits between the logging layer and the caller, its
/// inner writer is returned instead of the one the logger wrapped.
pub fn unlogged<'a, B>(
    req: &http::Request<B>,
    w: &'a mut dyn ResponseWriter,
) -> &'a mut dyn ResponseWriter {
    if lookup(req.extensions()).is_none() || w.unwrap_writer().is_none() {
        return w;
    }
    match w.unwrap_writer() {
        Some(inner) => inner,
        // Checked above; a second lookup is needed to hand `w` back on the
        // early-return path.
        None => unreachable!("unwrap_writer returned Some a moment ago"),
    }
}

/// The request's logger, or a [`PassthroughLogger`] when none is attached.
pub fn log_of<B>(req: &http::Request<B>) -> LogHandle {
    match lookup(req.extensions()) {
        Some(rl) => LogHandle::Request(rl),
        None => LogHandle::Passthrough(PassthroughLogger),
    }
}

// ── Context-addressed annotations ─────────────────────────────────────────────

/// Appends a free-text line to the request's entry. No-op without a logger.
pub fn add_info(extensions: &Extensions, args: fmt::Arguments<'_>) {
    if let Some(rl) = extensions.get::<RespLogger>() {
        rl.addf(args);
    }
}

/// Appends a structured field to the request's entry. No-op without a logger.
pub fn add_key_value(extensions: &Extensions, key: impl Into<String>, value: impl Into<Value>) {
    if let Some(rl) = extensions.get::<RespLogger>() {
        rl.add_key_value(key, value);
    }
}
