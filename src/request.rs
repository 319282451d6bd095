//! Incoming request type and the per-request metadata the logger reads.
//!
//! Upstream layers (the server, an authentication filter, a router) describe
//! the request by inserting these types into its [`http::Extensions`]. Each is
//! optional; the logger falls back when one is missing.

use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};

/// An incoming HTTP request with its body fully read.
pub type Request = http::Request<Bytes>;

/// Audit identifiers longer than this are cut before logging.
const MAX_AUDIT_ID_LEN: usize = 64;

// ── Extension types ───────────────────────────────────────────────────────────

/// Peer address of the connection the request arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// When the server first saw the request, before any middleware ran.
#[derive(Clone, Copy, Debug)]
pub struct ReceivedTimestamp(pub Instant);

/// Identifier correlating the request across logging and audit subsystems.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditId(pub String);

/// Routing metadata resolved for the request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// `false` for non-resource paths such as `/healthz`.
    pub is_resource_request: bool,
    /// Lowercase routing verb (`get`, `list`, `create`, ...).
    pub verb: String,
    pub namespace: String,
    pub name: String,
}

// ── Accessors ─────────────────────────────────────────────────────────────────

pub fn received_timestamp(extensions: &Extensions) -> Option<Instant> {
    extensions.get::<ReceivedTimestamp>().map(|ts| ts.0)
}

/// The request's audit ID cut to at most 64 bytes, or `""` when absent.
pub fn audit_id_truncated(extensions: &Extensions) -> String {
    let Some(AuditId(id)) = extensions.get::<AuditId>() else {
        return String::new();
    };
    if id.len() <= MAX_AUDIT_ID_LEN {
        return id.clone();
    }
    let end = (0..=MAX_AUDIT_ID_LEN).rev().find(|&i| id.is_char_boundary(i)).unwrap_or(0);
    id[..end].to_owned()
}

// ── RequestMeta ───────────────────────────────────────────────────────────────

/// What the access log needs to know about a request, captured up front.
///
/// The request itself moves into the handler, so the logger keeps this
/// snapshot instead of a reference.
#[derive(Clone, Debug)]
pub struct RequestMeta {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    audit_id: String,
    info: Option<RequestInfo>,
}

impl RequestMeta {
    pub fn from_request<B>(req: &http::Request<B>) -> Self {
        let ext = req.extensions();
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            headers: req.headers().clone(),
            remote_addr: ext.get::<RemoteAddr>().map(|a| a.0),
            audit_id: audit_id_truncated(ext),
            info: ext.get::<RequestInfo>().cloned(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn audit_id(&self) -> &str { &self.audit_id }
    pub fn info(&self) -> Option<&RequestInfo> { self.info.as_ref() }

    /// Header lookup; `None` when absent or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn user_agent(&self) -> &str {
        self.header(http::header::USER_AGENT.as_str()).unwrap_or_default()
    }

    /// `ip:port` of the peer, or `""` when the server did not record it.
    pub fn src_ip(&self) -> String {
        self.remote_addr.map(|a| a.to_string()).unwrap_or_default()
    }

    /// First value of query parameter `key`. A bare `?key` yields `Some("")`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.uri.query()?.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k == key).then_some(v)
        })
    }
}
