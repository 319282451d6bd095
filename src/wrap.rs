//! Decorating a writer without changing what it can do.
//!
//! Code further down the stack probes writers (`as_flusher`, `as_hijacker`,
//! ...) to pick a strategy: stream or buffer, upgrade or refuse. Logging must
//! not change those answers. If the decorator claimed a capability the real
//! writer lacks, callers would pick a strategy that fails; if it hid one, a
//! WebSocket upgrade or a streamed response would silently break.
//!
//! So [`wrap`] probes the writer once and records the result as a [`Shape`],
//! one variant per capability combination. [`LoggedWriter`] answers every
//! probe from that shape alone.

use std::io;

use http::HeaderMap;
use tokio::sync::watch;

use crate::error::Error;
use crate::logger::RespLogger;
use crate::writer::{CloseNotifier, Flusher, Hijacked, Hijacker, ResponseWriter};

/// The capability set of a writer beyond headers and body bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Plain,
    Flush,
    CloseNotify,
    Hijack,
    FlushCloseNotify,
    FlushHijack,
    CloseNotifyHijack,
    FlushCloseNotifyHijack,
}

impl Shape {
    /// Asks `w` which capabilities it has.
    pub fn probe(w: &mut dyn ResponseWriter) -> Self {
        let flush = w.as_flusher().is_some();
        let close_notify = w.as_close_notifier().is_some();
        let hijack = w.as_hijacker().is_some();

        match (flush, close_notify, hijack) {
            (false, false, false) => Self::Plain,
            (true,  false, false) => Self::Flush,
            (false, true,  false) => Self::CloseNotify,
            (false, false, true)  => Self::Hijack,
            (true,  true,  false) => Self::FlushCloseNotify,
            (true,  false, true)  => Self::FlushHijack,
            (false, true,  true)  => Self::CloseNotifyHijack,
            (true,  true,  true)  => Self::FlushCloseNotifyHijack,
        }
    }

    pub fn flush(self) -> bool {
        matches!(self, Self::Flush | Self::FlushCloseNotify | Self::FlushHijack | Self::FlushCloseNotifyHijack)
    }

    pub fn close_notify(self) -> bool {
        matches!(
            self,
            Self::CloseNotify | Self::FlushCloseNotify | Self::CloseNotifyHijack | Self::FlushCloseNotifyHijack
        )
    }

    pub fn hijack(self) -> bool {
        matches!(self, Self::Hijack | Self::FlushHijack | Self::CloseNotifyHijack | Self::FlushCloseNotifyHijack)
    }
}

// ── LoggedWriter ──────────────────────────────────────────────────────────────

/// A [`ResponseWriter`] that reports status, body and hijacking to a
/// [`RespLogger`] before handing each call to the writer it wraps.
pub struct LoggedWriter<'w> {
    logger: RespLogger,
    inner: &'w mut dyn ResponseWriter,
    shape: Shape,
}

/// Wraps `inner`, exposing exactly the capabilities `inner` has.
pub fn wrap<'w>(logger: RespLogger, inner: &'w mut dyn ResponseWriter) -> LoggedWriter<'w> {
    let shape = Shape::probe(inner);
    LoggedWriter { logger, inner, shape }
}

impl LoggedWriter<'_> {
    pub fn logger(&self) -> &RespLogger {
        &self.logger
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }
}

impl ResponseWriter for LoggedWriter<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: u16) {
        if self.logger.on_write_header(status) {
            self.inner.write_header(status);
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.logger.on_write(buf).map_err(Error::into_io)?;
        self.inner.write(buf)
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        if self.shape.flush() { Some(self) } else { None }
    }

    fn as_close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        if self.shape.close_notify() { Some(self) } else { None }
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        if self.shape.hijack() { Some(self) } else { None }
    }

    fn unwrap_writer(&mut self) -> Option<&mut dyn ResponseWriter> {
        Some(&mut *self.inner)
    }
}

impl Flusher for LoggedWriter<'_> {
    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_flusher() {
            Some(f) => f.flush(),
            None => Err(Error::FlushUnsupported.into_io()),
        }
    }
}

impl CloseNotifier for LoggedWriter<'_> {
    fn close_notify(&mut self) -> watch::Receiver<bool> {
        match self.inner.as_close_notifier() {
            Some(n) => n.close_notify(),
            None => {
                tracing::warn!("{}", Error::CloseNotifyUnsupported);
                watch::channel(false).1
            }
        }
    }
}

impl Hijacker for LoggedWriter<'_> {
    fn hijack(&mut self) -> Result<Hijacked, Error> {
        let hijacker = self.inner.as_hijacker().ok_or(Error::HijackUnsupported)?;
        self.logger.on_hijack();
        hijacker.hijack()
    }
}
