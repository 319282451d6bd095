//! Which response statuses deserve a stack trace in the access log.

use std::collections::HashSet;
use std::sync::Arc;

use http::StatusCode;

/// Decides, per status code, whether the logger captures a stack trace and
/// echoes the response body into the record.
pub type StacktracePred = Arc<dyn Fn(u16) -> bool + Send + Sync + 'static>;

/// Informational and server-error statuses, except `101 Switching Protocols`.
///
/// A protocol upgrade is the one expected non-2xx outcome, so it is never
/// treated as an error.
pub fn default_stacktrace_pred(status: u16) -> bool {
    (status < StatusCode::OK.as_u16() || status >= StatusCode::INTERNAL_SERVER_ERROR.as_u16())
        && status != StatusCode::SWITCHING_PROTOCOLS.as_u16()
}

/// A predicate that fires for every status *not* listed.
///
/// ```rust
/// let pred = httplog::status_is_not([200, 204]);
/// assert!(!pred(200));
/// assert!(pred(404));
/// ```
pub fn status_is_not(statuses: impl IntoIterator<Item = u16>) -> StacktracePred {
    let quiet: HashSet<u16> = statuses.into_iter().collect();
    Arc::new(move |status| !quiet.contains(&status))
}
