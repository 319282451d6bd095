//! Turning an HTTP method into the logical verb shown in the access log.
//!
//! A `GET` against a collection is really a `LIST`, a `GET ?watch=true` is a
//! `WATCH`, and a `PATCH` with the server-side-apply content type is an
//! `APPLY`. The rules live behind [`VerbResolver`] so a server with its own
//! routing model can substitute them.

use crate::request::{RequestInfo, RequestMeta};

/// Content type marking a `PATCH` as a server-side apply.
pub const APPLY_PATCH_CONTENT_TYPE: &str = "application/apply-patch+yaml";

pub trait VerbResolver: Send + Sync + 'static {
    /// Short label for what the request addresses: `resource`, `namespace`,
    /// `cluster`, or `""` for non-resource requests.
    fn scope(&self, info: &RequestInfo) -> String;

    /// Refines an uppercase method with the scope (`GET` + collection → `LIST`).
    fn canonical_verb(&self, verb: &str, scope: &str) -> String;

    /// Final adjustments that need the raw request (watch and apply detection).
    fn clean_verb(&self, verb: &str, req: &RequestMeta) -> String;

    /// Runs the full pipeline. Without routing info the method is used as-is.
    fn resolve(&self, req: &RequestMeta) -> String {
        let mut verb = req.method().as_str().to_owned();
        if let Some(info) = req.info() {
            let scope = self.scope(info);
            verb = self.canonical_verb(&verb.to_uppercase(), &scope);
        }
        self.clean_verb(&verb, req)
    }
}

/// The standard classification rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardVerbs;

impl VerbResolver for StandardVerbs {
    fn scope(&self, info: &RequestInfo) -> String {
        let scope = if !info.name.is_empty() || info.verb == "create" {
            "resource"
        } else if !info.namespace.is_empty() {
            "namespace"
        } else if info.is_resource_request {
            "cluster"
        } else {
            ""
        };
        scope.to_owned()
    }

    fn canonical_verb(&self, verb: &str, scope: &str) -> String {
        match verb {
            "GET" | "HEAD" if !scope.is_empty() && scope != "resource" => "LIST".to_owned(),
            _ => verb.to_owned(),
        }
    }

    fn clean_verb(&self, verb: &str, req: &RequestMeta) -> String {
        if is_watch(req) || verb == "WATCHLIST" {
            return "WATCH".to_owned();
        }
        if verb == "PATCH" && req.header("content-type") == Some(APPLY_PATCH_CONTENT_TYPE) {
            return "APPLY".to_owned();
        }
        verb.to_owned()
    }
}

fn is_watch(req: &RequestMeta) -> bool {
    let method = req.method().as_str();
    if !method.eq_ignore_ascii_case("GET") && !method.eq_ignore_ascii_case("LIST") {
        return false;
    }
    match req.query_value("watch") {
        Some(v) => !v.eq_ignore_ascii_case("0") && !v.eq_ignore_ascii_case("false"),
        None => false,
    }
}
