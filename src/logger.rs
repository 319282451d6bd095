//! Per-request access-log state.
//!
//! A [`RespLogger`] is created for each request by
//! [`WithLogging`](crate::middleware::WithLogging). One clone lives in the
//! request's extensions so handler code can annotate the entry, another inside
//! the [`LoggedWriter`](crate::LoggedWriter) so writes can record the status.
//! Both point at the same state.

use std::backtrace::Backtrace;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use http::StatusCode;

use crate::error::Error;
use crate::predicate::{StacktracePred, default_stacktrace_pred};
use crate::record::{LogRecord, LogSink, Value};
use crate::request::RequestMeta;
use crate::verb::{StandardVerbs, VerbResolver};

/// Captured stack traces are cut to this many bytes.
const MAX_STACK_LEN: usize = 50 * 1024;

/// Handle to one request's access-log entry. Cloning shares the entry.
#[derive(Clone)]
pub struct RespLogger {
    state: Arc<Mutex<State>>,
}

struct State {
    meta: RequestMeta,
    start_time: Instant,
    verbs: Arc<dyn VerbResolver>,
    stacktrace_pred: StacktracePred,

    hijacked: bool,
    status_recorded: bool,
    status: u16,
    status_stack: String,
    capture_error_output: bool,
    added_info: String,
    added_pairs: Vec<(String, Value)>,
}

impl State {
    fn addf(&mut self, args: fmt::Arguments<'_>) {
        self.added_info.push('\n');
        let _ = self.added_info.write_fmt(args);
    }
}

/// The current stack, cut to [`MAX_STACK_LEN`] bytes and prefixed with a newline.
fn capture_stack() -> String {
    let mut stack = Backtrace::force_capture().to_string();
    if stack.len() > MAX_STACK_LEN {
        let end = (0..=MAX_STACK_LEN).rev().find(|&i| stack.is_char_boundary(i)).unwrap_or(0);
        stack.truncate(end);
    }
    format!("\n{stack}")
}

impl RespLogger {
    /// Starts an entry for the request described by `meta`, timed from `start_time`.
    pub fn new(meta: RequestMeta, start_time: Instant) -> Self {
        let state = State {
            meta,
            start_time,
            verbs: Arc::new(StandardVerbs),
            stacktrace_pred: Arc::new(default_stacktrace_pred),
            hijacked: false,
            status_recorded: false,
            status: 0,
            status_stack: String::new(),
            capture_error_output: false,
            added_info: String::new(),
            added_pairs: Vec::new(),
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Shortcut for [`RespLogger::new`] timed from now.
    pub fn for_request<B>(req: &http::Request<B>) -> Self {
        Self::new(RequestMeta::from_request(req), Instant::now())
    }

    pub fn with_verb_resolver(self, verbs: Arc<dyn VerbResolver>) -> Self {
        self.lock().verbs = verbs;
        self
    }

    /// Replaces the stack-trace predicate. Only statuses recorded afterwards
    /// are affected.
    pub fn stacktrace_when(&self, pred: StacktracePred) -> &Self {
        self.lock().stacktrace_pred = pred;
        self
    }

    /// Appends a free-text line to the entry's `addedInfo`.
    pub fn addf(&self, args: fmt::Arguments<'_>) {
        self.lock().addf(args);
    }

    /// Appends a structured field. Repeated keys are all kept, in order.
    pub fn add_key_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.lock().added_pairs.push((key.into(), value.into()));
    }

    /// The first status recorded, if any.
    pub fn status(&self) -> Option<u16> {
        let state = self.lock();
        state.status_recorded.then_some(state.status)
    }

    pub fn is_hijacked(&self) -> bool {
        self.lock().hijacked
    }

    pub fn added_info(&self) -> String {
        self.lock().added_info.clone()
    }

    /// Captured stack trace, `""` unless the recorded status matched the predicate.
    pub fn status_stack(&self) -> String {
        self.lock().status_stack.clone()
    }

    // ── Writer hooks ──────────────────────────────────────────────────────────

    /// Returns `false` when the header must not reach the wire because the
    /// connection is gone.
    pub(crate) fn on_write_header(&self, status: u16) -> bool {
        if self.lock().hijacked {
            tracing::debug!(status, "ignoring write_header on a hijacked connection");
            return false;
        }
        self.record_status(status);
        true
    }

    pub(crate) fn on_write(&self, buf: &[u8]) -> Result<(), Error> {
        if self.lock().hijacked {
            return Err(Error::Hijacked);
        }
        self.record_status(StatusCode::OK.as_u16());

        let mut state = self.lock();
        if state.capture_error_output {
            state.addf(format_args!("logging error output: {:?}\n", String::from_utf8_lossy(buf)));
        }
        Ok(())
    }

    /// Records `status` unless one is already recorded.
    ///
    /// The predicate and the stack capture run without the lock held, so a
    /// predicate may call back into this logger.
    fn record_status(&self, status: u16) {
        let pred = {
            let state = self.lock();
            if state.status_recorded {
                return;
            }
            Arc::clone(&state.stacktrace_pred)
        };

        let stack = pred(status).then(capture_stack);

        let mut state = self.lock();
        if state.status_recorded {
            return;
        }
        state.status = status;
        state.status_recorded = true;
        if let Some(stack) = stack {
            state.status_stack = stack;
            state.capture_error_output = true;
        }
    }

    pub(crate) fn on_hijack(&self) {
        self.lock().hijacked = true;
    }

    // ── Emission ──────────────────────────────────────────────────────────────

    /// Builds the finished entry.
    ///
    /// Field order: `verb`, `URI`, `latency`, `userAgent`, `audit-ID`, `srcIP`,
    /// every added pair, then either `hijacked` or `resp` followed by the
    /// optional `statusStack` and `addedInfo`.
    pub fn record(&self) -> LogRecord {
        let state = self.lock();
        let meta = &state.meta;

        let mut record = LogRecord::new();
        record.push("verb", state.verbs.resolve(meta));
        record.push("URI", meta.uri().to_string());
        record.push("latency", state.start_time.elapsed());
        record.push("userAgent", meta.user_agent());
        record.push("audit-ID", meta.audit_id());
        record.push("srcIP", meta.src_ip());
        for (key, value) in &state.added_pairs {
            record.push(key.clone(), value.clone());
        }

        if state.hijacked {
            record.push("hijacked", true);
        } else {
            record.push("resp", state.status);
            if !state.status_stack.is_empty() {
                record.push("statusStack", state.status_stack.clone());
            }
            if !state.added_info.is_empty() {
                record.push("addedInfo", state.added_info.clone());
            }
        }
        record
    }

    /// Sends the finished entry to `sink`. Call once, when the request is done.
    pub fn log(&self, sink: &dyn LogSink) {
        sink.log(self.record());
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking predicate must not cost us the final entry.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RespLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("RespLogger")
            .field("method", state.meta.method())
            .field("uri", state.meta.uri())
            .field("status", &state.status_recorded.then_some(state.status))
            .field("hijacked", &state.hijacked)
            .finish_non_exhaustive()
    }
}
