//! The access-log record and where it goes.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use tracing::Level;

/// `tracing` target used for every access-log event.
pub const TARGET: &str = "httplog";

// ── Value ─────────────────────────────────────────────────────────────────────

/// A single field value in a [`LogRecord`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Uint(u64),
    Bool(bool),
    Duration(Duration),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s)      => write!(f, "{s:?}"),
            Self::Int(n)      => write!(f, "{n}"),
            Self::Uint(n)     => write!(f, "{n}"),
            Self::Bool(b)     => write!(f, "{b}"),
            Self::Duration(d) => write!(f, "{d:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::Str(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Self::Str(s) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self { Self::Int(n.into()) }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self { Self::Uint(n) }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self { Self::Uint(n.into()) }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self { Self::Uint(n as u64) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Self::Bool(b) }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self { Self::Duration(d) }
}

// ── LogRecord ─────────────────────────────────────────────────────────────────

/// An ordered list of key/value pairs. Keys may repeat.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogRecord {
    fields: Vec<(Cow<'static, str>, Value)>,
}

impl LogRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<Cow<'static, str>>, value: impl Into<Value>) {
        self.fields.push((key.into(), value.into()));
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_ref())
    }

    pub fn fields(&self) -> &[(Cow<'static, str>, Value)] {
        &self.fields
    }
}

/// `key=value` pairs separated by spaces, strings quoted.
impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

/// Destination for finished access-log records.
pub trait LogSink: Send + Sync + 'static {
    /// Whether records would be kept at all. When `false` the middleware
    /// skips emission entirely.
    fn enabled(&self) -> bool;

    fn log(&self, record: LogRecord);
}

/// Emits each record as a `DEBUG` event on the [`TARGET`] target.
///
/// The whole record goes out as one `record` field holding its `key=value`
/// rendering. `tracing` field names are fixed at compile time, so the
/// per-request keys added through `add_key_value` cannot become separate
/// event fields; a JSON subscriber sees a single string. Implement
/// [`LogSink`] directly when each field has to arrive on its own.
///
/// Enable it with a filter such as `RUST_LOG=httplog=debug`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn enabled(&self) -> bool {
        tracing::enabled!(target: TARGET, Level::DEBUG)
    }

    fn log(&self, record: LogRecord) {
        tracing::debug!(target: TARGET, record = %record, "HTTP");
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Keeps every record in memory.
    #[derive(Clone, Default)]
    pub(crate) struct CaptureSink(Arc<Mutex<Vec<LogRecord>>>);

    impl CaptureSink {
        pub(crate) fn records(&self) -> Vec<LogRecord> {
            self.0.lock().unwrap().clone()
        }
    }

    impl LogSink for CaptureSink {
        fn enabled(&self) -> bool {
            true
        }

        fn log(&self, record: LogRecord) {
            self.0.lock().unwrap().push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_keeps_insertion_order_and_duplicates() {
        let mut record = LogRecord::new();
        record.push("verb", "GET");
        record.push("resp", 200u16);
        record.push("k", "a");
        record.push("k", true);

        assert_eq!(record.to_string(), r#"verb="GET" resp=200 k="a" k=true"#);
        assert_eq!(record.get("k"), Some(&Value::from("a")));
        assert_eq!(record.keys().collect::<Vec<_>>(), ["verb", "resp", "k", "k"]);
    }

    #[test]
    fn strings_are_escaped() {
        let mut record = LogRecord::new();
        record.push("addedInfo", "\nline \"two\"");
        assert_eq!(record.to_string(), r#"addedInfo="\nline \"two\"""#);
    }
}
