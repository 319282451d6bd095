//! End-to-end: a real server, a real socket, the logging layer in between.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use httplog::{
    LogRecord, LogSink, ResponseWriter, Server, Value, add_key_value, handler_fn,
    middleware::WithLogging,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<LogRecord>>>);

impl Capture {
    fn records(&self) -> Vec<LogRecord> {
        self.0.lock().unwrap().clone()
    }
}

impl LogSink for Capture {
    fn enabled(&self) -> bool {
        true
    }

    fn log(&self, record: LogRecord) {
        self.0.lock().unwrap().push(record);
    }
}

struct Running {
    port: u16,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), httplog::Error>>,
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not drain in time")
            .unwrap()
            .unwrap();
    }
}

fn start(sink: Capture) -> Running {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let app = handler_fn(|w, req| Box::pin(async move {
        match req.uri().path() {
            "/created" => {
                add_key_value(req.extensions(), "size", req.body().len());
                w.write_header(201);
                let _ = w.write(b"made it");
            }
            "/fail" => {
                w.write_header(503);
                let _ = w.write(b"try later");
            }
            "/echo" => echo(w),
            _ => {
                let _ = w.write(b"ok");
            }
        }
    }));

    let (stop, stopped) = oneshot::channel::<()>();
    let server = Server::bind(&format!("127.0.0.1:{port}"));
    let handle = tokio::spawn(server.serve_with_shutdown(WithLogging::new(app).sink(sink), async {
        let _ = stopped.await;
    }));

    Running { port, stop, handle }
}

fn echo(w: &mut dyn ResponseWriter) {
    w.headers_mut().insert("connection", "upgrade".parse().unwrap());
    w.headers_mut().insert("upgrade", "echo".parse().unwrap());
    w.write_header(101);
    let hijacked = w.as_hijacker().expect("upgrade request is hijackable").hijack().unwrap();
    tokio::spawn(async move {
        let mut conn = hijacked.await.unwrap();
        let mut buf = [0u8; 4];
        conn.read_exact(&mut buf).await.unwrap();
        conn.write_all(&buf).await.unwrap();
    });
}

async fn connect(port: u16) -> TcpStream {
    for _ in 0..100 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server never started listening on {port}");
}

async fn round_trip(port: u16, raw: &str) -> String {
    let mut stream = connect(port).await;
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn logs_status_fields_and_peer_for_each_request() {
    let sink = Capture::default();
    let server = start(sink.clone());

    let response = round_trip(
        server.port,
        "POST /created?x=1 HTTP/1.1\r\nhost: test\r\nuser-agent: itest/1.0\r\n\
         content-length: 5\r\nconnection: close\r\n\r\nhello",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 201"), "{response}");
    assert!(response.ends_with("made it"), "{response}");

    server.shutdown().await;

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.get("verb"), Some(&Value::from("POST")));
    assert_eq!(record.get("URI"), Some(&Value::from("/created?x=1")));
    assert_eq!(record.get("userAgent"), Some(&Value::from("itest/1.0")));
    assert_eq!(record.get("size"), Some(&Value::from(5usize)));
    assert_eq!(record.get("resp"), Some(&Value::from(201u16)));

    let Some(Value::Str(src)) = record.get("srcIP") else {
        panic!("srcIP should be recorded");
    };
    assert!(src.starts_with("127.0.0.1:"), "{src}");
}

#[tokio::test]
async fn error_statuses_carry_stack_and_body() {
    let sink = Capture::default();
    let server = start(sink.clone());

    let response = round_trip(
        server.port,
        "GET /fail HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 503"), "{response}");

    server.shutdown().await;

    let record = &sink.records()[0];
    assert_eq!(record.get("resp"), Some(&Value::from(503u16)));
    assert!(record.get("statusStack").is_some());
    let Some(Value::Str(info)) = record.get("addedInfo") else {
        panic!("error body should be echoed into addedInfo");
    };
    assert!(info.contains("logging error output: \"try later\""), "{info}");
}

#[tokio::test]
async fn upgraded_connection_is_logged_as_hijacked() {
    let sink = Capture::default();
    let server = start(sink.clone());

    let mut stream = connect(server.port).await;
    stream
        .write_all(b"GET /echo HTTP/1.1\r\nhost: test\r\nconnection: upgrade\r\nupgrade: echo\r\n\r\n")
        .await
        .unwrap();

    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await.unwrap();
        head.push(byte[0]);
    }
    assert!(head.starts_with(b"HTTP/1.1 101"));

    stream.write_all(b"ping").await.unwrap();
    let mut echoed = [0u8; 4];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"ping");
    drop(stream);

    server.shutdown().await;

    let record = &sink.records()[0];
    assert_eq!(record.get("hijacked"), Some(&Value::from(true)));
    assert!(record.get("resp").is_none());
}
