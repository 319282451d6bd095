//! Minimal httplog example: a few endpoints behind the logging layer.
//!
//! Run with:
//!   RUST_LOG=httplog=debug,info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/boom
//!   curl -i -H 'connection: upgrade' -H 'upgrade: echo' http://localhost:3000/echo

use httplog::{
    Request, ResponseWriter, Server, add_info, add_key_value, handler_fn,
    middleware::WithLogging, status_is_not,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("httplog=debug,info")),
        )
        .init();

    let app = handler_fn(|w, req| Box::pin(async move {
        match (req.method().as_str(), req.uri().path()) {
            ("GET", path) if path.starts_with("/users/") => get_user(w, &req),
            ("POST", "/users") => create_user(w, &req),
            ("GET", "/boom") => boom(w, &req),
            ("GET", "/echo") => echo(w, &req),
            _ => w.write_header(404),
        }
    }));

    // Every status except the expected ones gets a stack trace in its entry.
    let logged = WithLogging::new(app).stacktrace_when(status_is_not([200, 201, 404]));

    Server::bind("0.0.0.0:3000")
        .serve(logged)
        .await
        .expect("server error");
}

// GET /users/:id
fn get_user(w: &mut dyn ResponseWriter, req: &Request) {
    let id = req.uri().path().trim_start_matches("/users/");
    add_key_value(req.extensions(), "user", id.to_owned());
    w.headers_mut().insert("content-type", http::HeaderValue::from_static("application/json"));
    let _ = w.write(format!(r#"{{"id":"{id}","name":"alice"}}"#).as_bytes());
}

// POST /users
fn create_user(w: &mut dyn ResponseWriter, req: &Request) {
    if req.body().is_empty() {
        add_info(req.extensions(), format_args!("rejected: empty body"));
        w.write_header(400);
        let _ = w.write(b"body required");
        return;
    }
    add_key_value(req.extensions(), "bytes", req.body().len());
    w.headers_mut().insert("location", http::HeaderValue::from_static("/users/99"));
    w.write_header(201);
}

// GET /boom: 500 with the error text echoed into the access-log entry.
fn boom(w: &mut dyn ResponseWriter, _req: &Request) {
    w.write_header(500);
    let _ = w.write(b"database unavailable");
}

// GET /echo with `upgrade: echo`: take over the connection and echo bytes back.
fn echo(w: &mut dyn ResponseWriter, req: &Request) {
    if !req.headers().contains_key(http::header::UPGRADE) {
        w.write_header(426);
        return;
    }
    w.headers_mut().insert(http::header::CONNECTION, http::HeaderValue::from_static("upgrade"));
    w.headers_mut().insert(http::header::UPGRADE, http::HeaderValue::from_static("echo"));
    w.write_header(101);

    let Some(hijacker) = w.as_hijacker() else {
        return;
    };
    let hijacked = match hijacker.hijack() {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!("hijack failed: {e}");
            return;
        }
    };

    tokio::spawn(async move {
        let mut conn = match hijacked.await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("upgrade failed: {e}");
                return;
            }
        };
        let mut buf = [0u8; 1024];
        while let Ok(n) = conn.read(&mut buf).await {
            if n == 0 || conn.write_all(&buf[..n]).await.is_err() {
                break;
            }
        }
    });
}
