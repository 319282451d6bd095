//! Unified error type.

/// The error type returned by httplog's fallible operations.
///
/// HTTP-level outcomes (404, 500, ...) are written through a
/// [`ResponseWriter`](crate::ResponseWriter), not expressed as `Error`s. This
/// type surfaces infrastructure failures and capability misuse.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("hyper: {0}")]
    Hyper(#[from] hyper::Error),

    /// `hijack` was called on a writer that cannot take over the connection.
    #[error("response writer does not support hijacking")]
    HijackUnsupported,

    /// The connection was already handed over to the caller.
    #[error("connection has been hijacked")]
    Hijacked,

    #[error("response writer does not support flushing")]
    FlushUnsupported,

    #[error("response writer does not support close notification")]
    CloseNotifyUnsupported,
}

impl Error {
    /// Wraps `self` in an [`std::io::Error`] for `write`-style return values.
    pub(crate) fn into_io(self) -> std::io::Error {
        match self {
            Self::Io(e) => e,
            other => std::io::Error::other(other),
        }
    }
}
