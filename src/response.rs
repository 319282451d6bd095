//! The writer the server hands to handlers.
//!
//! [`HttpResponseWriter`] buffers the status, headers and body a handler
//! writes, then becomes one `http::Response` when the handler is done. It can
//! be hijacked when hyper marked the request as upgradable (an `Upgrade`
//! header or `CONNECT`); it cannot flush or report disconnects, and its probes
//! say so.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

use crate::error::Error;
use crate::writer::{Hijacked, Hijacker, ResponseWriter};

/// A buffering [`ResponseWriter`] backed by hyper.
///
/// The first status written wins; later ones are dropped with a debug event,
/// so the status the access log records is the status that goes out.
#[derive(Debug, Default)]
pub struct HttpResponseWriter {
    status: Option<u16>,
    headers: HeaderMap,
    body: BytesMut,
    upgradable: bool,
    on_upgrade: Option<OnUpgrade>,
}

impl HttpResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer that can hand over the connection once `on_upgrade` resolves.
    pub fn upgradable(on_upgrade: OnUpgrade) -> Self {
        Self { upgradable: true, on_upgrade: Some(on_upgrade), ..Self::default() }
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Finishes the exchange.
    ///
    /// Nothing written means `200 OK` with an empty body. A status outside
    /// `100..=999` becomes `500 Internal Server Error`.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status.unwrap_or(200))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for HttpResponseWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: u16) {
        match self.status {
            None => self.status = Some(status),
            Some(sent) => tracing::debug!(sent, ignored = status, "superfluous write_header call"),
        }
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK.as_u16());
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        if self.upgradable { Some(self) } else { None }
    }
}

impl Hijacker for HttpResponseWriter {
    /// Resolves after the handler returned and the `101` response went out.
    fn hijack(&mut self) -> Result<Hijacked, Error> {
        let on_upgrade = self.on_upgrade.take().ok_or(Error::Hijacked)?;
        Ok(Hijacked::new(async move {
            let upgraded = on_upgrade.await?;
            Ok::<_, Error>(TokioIo::new(upgraded))
        }))
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_of(response: http::Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn empty_writer_is_an_empty_ok() {
        let response = HttpResponseWriter::new().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn first_status_and_all_bytes_are_kept() {
        let mut w = HttpResponseWriter::new();
        w.headers_mut().insert("content-type", "text/plain".parse().unwrap());
        w.write_header(418);
        w.write_header(200);
        w.write(b"short ").unwrap();
        w.write(b"and stout").unwrap();

        let response = w.into_response();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(body_of(response).await, "short and stout");
    }

    #[test]
    fn body_without_status_is_ok() {
        let mut w = HttpResponseWriter::new();
        w.write(b"x").unwrap();
        assert_eq!(w.status(), Some(200));
    }

    #[test]
    fn invalid_status_becomes_500() {
        let mut w = HttpResponseWriter::new();
        w.write_header(42);
        assert_eq!(w.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn plain_requests_cannot_be_hijacked() {
        let mut w = HttpResponseWriter::new();
        assert!(w.as_hijacker().is_none());
        assert!(w.as_flusher().is_none());
        assert!(w.as_close_notifier().is_none());
    }
}
