//! Handler trait.
//!
//! # How handlers see the response
//!
//! A handler does not return a response; it writes one. It receives the
//! request by value and a borrowed [`ResponseWriter`]:
//!
//! ```text
//! server                         handler
//!   │ HttpResponseWriter            │
//!   │──── &mut dyn ResponseWriter ─▶│ write_header / write / hijack
//!   │◀─────── future completes ─────│
//!   │ into_response()               │
//! ```
//!
//! Borrowing the writer is what lets a decorator such as
//! [`LoggedWriter`](crate::LoggedWriter) sit in between without taking
//! ownership of the real writer, and lets [`unlogged`](crate::unlogged) hand
//! the very same writer back.
//!
//! Closures become handlers through [`handler_fn`]:
//!
//! ```rust
//! use httplog::{handler_fn, Handler};
//!
//! let hello = handler_fn(|w, _req| Box::pin(async move {
//!     let _ = w.write(b"hello");
//! }));
//! # fn assert_handler(_: &impl Handler) {}
//! # assert_handler(&hello);
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::request::Request;
use crate::writer::ResponseWriter;

/// A heap-allocated, type-erased handler future borrowing the writer for `'a`.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Serves one request by writing to `w`.
pub trait Handler: Send + Sync + 'static {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, Request) -> BoxFuture<'a> + Send + Sync + 'static,
{
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a> {
        self(w, req)
    }
}

/// Pins down the higher-ranked closure signature so the compiler can infer
/// the writer's lifetime. Pass closures through this rather than directly.
pub fn handler_fn<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, Request) -> BoxFuture<'a> + Send + Sync + 'static,
{
    f
}
