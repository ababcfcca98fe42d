//! Destinations for finished access lines and for formatting diagnostics.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Structured metadata attached to an access line.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// The informational and error channels an adapter writes to.
///
/// Implementations must not panic: they are called from the request path.
pub trait AccessSink: Send + Sync {
    fn info(&self, line: &str, extra: Option<&Extra>);

    fn error(&self, message: &str);

    /// Report a failure together with its cause.
    fn exception(&self, message: &str, error: &dyn std::error::Error) {
        self.error(&format!("{}: {}", message, error));
    }
}

impl<T: AccessSink + ?Sized> AccessSink for Arc<T> {
    fn info(&self, line: &str, extra: Option<&Extra>) {
        (**self).info(line, extra)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }

    fn exception(&self, message: &str, error: &dyn std::error::Error) {
        (**self).exception(message, error)
    }
}

/// Emits `tracing` events on the `access` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AccessSink for TracingSink {
    fn info(&self, line: &str, extra: Option<&Extra>) {
        match extra {
            Some(extra) => {
                let extra = serde_json::to_string(extra).unwrap_or_default();
                tracing::info!(target: "access", extra = %extra, "{}", line);
            }
            None => tracing::info!(target: "access", "{}", line),
        }
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "access", "{}", message);
    }

    fn exception(&self, message: &str, error: &dyn std::error::Error) {
        tracing::error!(target: "access", error = %error, "{}", message);
    }
}

/// Writes lines to one writer and diagnostics to another.
pub struct WriterSink<O, E> {
    out: Mutex<O>,
    err: Mutex<E>,
    show_extra: bool,
}

impl<O: Write + Send, E: Write + Send> WriterSink<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            show_extra: false,
        }
    }

    /// Append the metadata as a tab-separated JSON object after each line.
    pub fn with_extra(mut self, show_extra: bool) -> Self {
        self.show_extra = show_extra;
        self
    }

    pub fn into_inner(self) -> (O, E) {
        let out = self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        let err = self.err.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        (out, err)
    }
}

impl<O: Write + Send, E: Write + Send> AccessSink for WriterSink<O, E> {
    fn info(&self, line: &str, extra: Option<&Extra>) {
        let Ok(mut out) = self.out.lock() else { return };
        // Write errors are dropped, the request must not fail on logging.
        let _ = match extra {
            Some(extra) if self.show_extra => {
                let extra = serde_json::to_string(extra).unwrap_or_default();
                writeln!(out, "{}\t{}", line, extra)
            }
            _ => writeln!(out, "{}", line),
        };
    }

    fn error(&self, message: &str) {
        if let Ok(mut err) = self.err.lock() {
            let _ = writeln!(err, "Error: {}", message);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkRecord {
    Info { line: String, extra: Option<Extra> },
    Error(String),
}

/// Keeps every call in memory. Handy for asserting on adapter output.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<SinkRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SinkRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn infos(&self) -> Vec<(String, Option<Extra>)> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                SinkRecord::Info { line, extra } => Some((line, extra)),
                SinkRecord::Error(_) => None,
            })
            .collect()
    }

    pub fn lines(&self) -> Vec<String> {
        self.infos().into_iter().map(|(line, _)| line).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                SinkRecord::Error(message) => Some(message),
                SinkRecord::Info { .. } => None,
            })
            .collect()
    }

    fn push(&self, record: SinkRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

impl AccessSink for MemorySink {
    fn info(&self, line: &str, extra: Option<&Extra>) {
        self.push(SinkRecord::Info {
            line: line.to_string(),
            extra: extra.cloned(),
        });
    }

    fn error(&self, message: &str) {
        self.push(SinkRecord::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_writer_sink_splits_channels() {
        let sink = WriterSink::new(Vec::new(), Vec::new());
        sink.info("GET / 200", None);
        sink.error("bad format");

        let (out, err) = sink.into_inner();
        assert_eq!(String::from_utf8(out).unwrap(), "GET / 200\n");
        assert_eq!(String::from_utf8(err).unwrap(), "Error: bad format\n");
    }

    #[test]
    fn test_writer_sink_extra_column() {
        let mut extra = Extra::new();
        extra.insert("m".to_string(), json!("GET"));

        let sink = WriterSink::new(Vec::new(), Vec::new()).with_extra(true);
        sink.info("line", Some(&extra));
        let (out, _) = sink.into_inner();
        assert_eq!(String::from_utf8(out).unwrap(), "line\t{\"m\":\"GET\"}\n");
    }

    #[test]
    fn test_memory_sink_through_arc() {
        let sink = Arc::new(MemorySink::new());
        let shared: Arc<MemorySink> = Arc::clone(&sink);
        shared.info("one", None);
        shared.exception("Error in logging", &std::fmt::Error);

        assert_eq!(sink.lines(), vec!["one".to_string()]);
        assert_eq!(sink.errors().len(), 1);
        assert!(sink.errors()[0].starts_with("Error in logging: "));
    }
}
