//! The response-writer contract and its optional capabilities.
//!
//! Every writer handles headers, a status line, and body bytes. Some writers
//! can do more:
//!
//! | Capability | Trait | Typical use |
//! |---|---|---|
//! | flush | [`Flusher`] | streaming bodies, server-sent events |
//! | close notification | [`CloseNotifier`] | stop work when the client goes away |
//! | hijack | [`Hijacker`] | WebSocket and other protocol upgrades |
//!
//! A writer advertises a capability by returning `Some` from the matching
//! `as_*` probe. Callers probe instead of assuming, so a writer must never
//! claim a capability it cannot honour.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::HeaderMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;

use crate::error::Error;

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// The outgoing half of one HTTP exchange.
///
/// Semantics follow the usual server contract: the first status written wins,
/// and writing body bytes before any status implies `200 OK`.
pub trait ResponseWriter: Send {
    /// Headers that will be sent with the status line.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_header(&mut self, status: u16);

    /// Writes body bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        None
    }

    fn as_close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        None
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }

    /// The writer this one decorates, if it is a decorator.
    fn unwrap_writer(&mut self) -> Option<&mut dyn ResponseWriter> {
        None
    }
}

// ── Capabilities ──────────────────────────────────────────────────────────────

/// Pushes buffered response bytes to the client.
pub trait Flusher {
    fn flush(&mut self) -> io::Result<()>;
}

/// Reports when the client connection goes away.
pub trait CloseNotifier {
    /// The receiver flips to `true` once the peer has disconnected.
    fn close_notify(&mut self) -> watch::Receiver<bool>;
}

/// Takes over the underlying connection, bypassing HTTP framing.
pub trait Hijacker {
    fn hijack(&mut self) -> Result<Hijacked, Error>;
}

// ── Hijacked connections ──────────────────────────────────────────────────────

/// A raw, bidirectional byte stream taken over from the HTTP layer.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

type ConnectionFuture = Pin<Box<dyn Future<Output = Result<Box<dyn Connection>, Error>> + Send>>;

/// The result of a successful [`Hijacker::hijack`].
///
/// Resolves to the raw connection. For upgrades served through hyper this only
/// happens after the `101 Switching Protocols` response has gone out, so
/// await it from a spawned task rather than inside the handler.
pub struct Hijacked {
    fut: ConnectionFuture,
}

impl Hijacked {
    pub fn new<F, C>(fut: F) -> Self
    where
        F: Future<Output = Result<C, Error>> + Send + 'static,
        C: Connection + 'static,
    {
        Self {
            fut: Box::pin(async move {
                let conn = fut.await?;
                Ok::<_, Error>(Box::new(conn) as Box<dyn Connection>)
            }),
        }
    }

    /// A hijack whose connection is already available.
    pub fn ready<C: Connection + 'static>(conn: C) -> Self {
        Self::new(std::future::ready(Ok(conn)))
    }
}

impl Future for Hijacked {
    type Output = Result<Box<dyn Connection>, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.fut.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for Hijacked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hijacked").finish_non_exhaustive()
    }
}

// ── Test doubles ──────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// A writer with a configurable capability set that records what it saw.
    #[derive(Default)]
    pub(crate) struct FakeWriter {
        pub(crate) flush: bool,
        pub(crate) close_notify: bool,
        pub(crate) hijack: bool,
        pub(crate) headers: HeaderMap,
        pub(crate) statuses: Vec<u16>,
        pub(crate) body: Vec<u8>,
        pub(crate) flushes: usize,
        pub(crate) hijacks: usize,
        /// Client end of the most recently hijacked connection.
        pub(crate) peer: Option<tokio::io::DuplexStream>,
        closed: Option<watch::Sender<bool>>,
    }

    impl FakeWriter {
        pub(crate) fn plain() -> Self {
            Self::default()
        }

        pub(crate) fn flush_close_notify() -> Self {
            Self { flush: true, close_notify: true, ..Self::default() }
        }

        pub(crate) fn flush_close_notify_hijack() -> Self {
            Self { flush: true, close_notify: true, hijack: true, ..Self::default() }
        }

        pub(crate) fn hijack_only() -> Self {
            Self { hijack: true, ..Self::default() }
        }

        pub(crate) fn flush_hijack() -> Self {
            Self { flush: true, hijack: true, ..Self::default() }
        }

        pub(crate) fn disconnect(&self) {
            if let Some(tx) = &self.closed {
                let _ = tx.send(true);
            }
        }
    }

    impl ResponseWriter for FakeWriter {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_header(&mut self, status: u16) {
            self.statuses.push(status);
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.body.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
            if self.flush { Some(self) } else { None }
        }

        fn as_close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
            if self.close_notify { Some(self) } else { None }
        }

        fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
            if self.hijack { Some(self) } else { None }
        }
    }

    impl Flusher for FakeWriter {
        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    impl CloseNotifier for FakeWriter {
        fn close_notify(&mut self) -> watch::Receiver<bool> {
            self.closed.get_or_insert_with(|| watch::channel(false).0).subscribe()
        }
    }

    impl Hijacker for FakeWriter {
        fn hijack(&mut self) -> Result<Hijacked, Error> {
            self.hijacks += 1;
            let (conn, peer) = tokio::io::duplex(64);
            self.peer = Some(peer);
            Ok(Hijacked::ready(conn))
        }
    }
}
