//! Access logging middleware.
//!
//! Per request:
//!
//! 1. **Install**: build a [`RespLogger`] timed from the request's
//!    [`ReceivedTimestamp`](crate::ReceivedTimestamp) (or now), attach it to
//!    the request, and wrap the writer in a [`LoggedWriter`](crate::LoggedWriter).
//! 2. **Delegate**: run the inner handler with the wrapped writer.
//! 3. **Emit**: when the sink is enabled, a drop guard sends the entry to the
//!    sink exactly once, whether the handler returned or panicked. A panic
//!    keeps unwinding after the entry is written.

use std::sync::Arc;
use std::time::Instant;

use crate::context::attach;
use crate::handler::{BoxFuture, Handler};
use crate::logger::RespLogger;
use crate::predicate::{StacktracePred, default_stacktrace_pred};
use crate::record::{LogSink, TracingSink};
use crate::request::{Request, RequestMeta, received_timestamp};
use crate::verb::{StandardVerbs, VerbResolver};
use crate::wrap::wrap;
use crate::writer::ResponseWriter;

/// Wraps a handler so every request it serves produces one access-log entry.
///
/// ```rust
/// use httplog::{handler_fn, middleware::WithLogging, status_is_not};
///
/// let app = handler_fn(|w, _req| Box::pin(async move {
///     w.write_header(404);
/// }));
///
/// // Capture stack traces for everything except the expected statuses.
/// let logged = WithLogging::new(app).stacktrace_when(status_is_not([200, 404]));
/// ```
///
/// # Panics
///
/// Serving a request that already carries a logger panics: it means two
/// `WithLogging` layers are stacked.
pub struct WithLogging<H> {
    inner: H,
    stacktrace_pred: StacktracePred,
    sink: Arc<dyn LogSink>,
    verbs: Arc<dyn VerbResolver>,
}

impl<H> WithLogging<H> {
    /// Logs through [`TracingSink`] with the default stack-trace predicate.
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            stacktrace_pred: Arc::new(default_stacktrace_pred),
            sink: Arc::new(TracingSink),
            verbs: Arc::new(StandardVerbs),
        }
    }

    pub fn stacktrace_when(mut self, pred: StacktracePred) -> Self {
        self.stacktrace_pred = pred;
        self
    }

    pub fn sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn verb_resolver(mut self, verbs: impl VerbResolver) -> Self {
        self.verbs = Arc::new(verbs);
        self
    }
}

impl<H: Handler> Handler for WithLogging<H> {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let start_time = received_timestamp(req.extensions()).unwrap_or_else(Instant::now);
            let logger = RespLogger::new(RequestMeta::from_request(&req), start_time)
                .with_verb_resolver(Arc::clone(&self.verbs));
            logger.stacktrace_when(Arc::clone(&self.stacktrace_pred));

            let req = attach(req, logger.clone());

            let _emit = self.sink.enabled().then(|| EmitOnDrop {
                logger: logger.clone(),
                sink: Arc::clone(&self.sink),
            });

            let mut w = wrap(logger, w);
            self.inner.serve(&mut w, req).await;
        })
    }
}

/// Writes the entry when dropped, including during a panic unwind.
struct EmitOnDrop {
    logger: RespLogger,
    sink: Arc<dyn LogSink>,
}

impl Drop for EmitOnDrop {
    fn drop(&mut self) {
        self.logger.log(self.sink.as_ref());
    }
}
