//! Access logger for asynchronous hosts.
//!
//! The format uses short directives (`%a %t "%r" %s %b`) that are compiled
//! once into a positional template plus one key per directive. Each request
//! produces a list of `(key, value)` pairs; the values fill the template in
//! order and the pairs are also attached to the line as structured metadata.

use crate::adapters::AccessOutcome;
use crate::config::LoggerConfig;
use crate::error::FormatError;
use crate::event::{header, AsyncRequest, AsyncResponse};
use crate::sink::{AccessSink, Extra};
use crate::status::Colorizer;
use crate::template::{escape_literal, render_positional};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

static FORMAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%(\{([A-Za-z0-9\-_]+)\}([ioe])|[atPrsbD]|Tf?)").expect("directive pattern is valid")
});

/// Key of one line value: a plain field, or a `(group, name)` pair for
/// header-like directives such as `%{User-Agent}i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LineKey {
    Field(String),
    Group(String, String),
}

impl LineKey {
    pub fn field(name: impl Into<String>) -> Self {
        LineKey::Field(name.into())
    }

    pub fn group(group: impl Into<String>, name: impl Into<String>) -> Self {
        LineKey::Group(group.into(), name.into())
    }
}

pub type LinePair = (LineKey, String);

/// Per-atom colorizing step over the line pairs. Returns the pairs to render.
/// Only runs while color output is enabled.
pub type PairsHook = Arc<dyn Fn(Vec<LinePair>) -> Vec<LinePair> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    RemoteAddress,
    RequestStartTime,
    ProcessId,
    FirstRequestLine,
    ResponseStatus,
    ResponseSize,
    RequestTime,
    RequestTimeFrac,
    RequestTimeMicro,
    RequestHeader,
    ResponseHeader,
    Environ,
}

impl Directive {
    fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "a" => Directive::RemoteAddress,
            "t" => Directive::RequestStartTime,
            "P" => Directive::ProcessId,
            "r" => Directive::FirstRequestLine,
            "s" => Directive::ResponseStatus,
            "b" => Directive::ResponseSize,
            "T" => Directive::RequestTime,
            "Tf" => Directive::RequestTimeFrac,
            "D" => Directive::RequestTimeMicro,
            "i" => Directive::RequestHeader,
            "o" => Directive::ResponseHeader,
            "e" => Directive::Environ,
            _ => return None,
        })
    }

    fn key_name(self) -> &'static str {
        match self {
            Directive::RemoteAddress => "remote_address",
            Directive::RequestStartTime => "request_start_time",
            Directive::ProcessId => "process_id",
            Directive::FirstRequestLine => "first_request_line",
            Directive::ResponseStatus => "response_status",
            Directive::ResponseSize => "response_size",
            Directive::RequestTime => "request_time",
            Directive::RequestTimeFrac => "request_time_frac",
            Directive::RequestTimeMicro => "request_time_micro",
            Directive::RequestHeader => "request_header",
            Directive::ResponseHeader => "response_header",
            Directive::Environ => "environ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyMethod {
    key: LineKey,
    directive: Directive,
    /// Header or variable name for the grouped directives.
    arg: Option<String>,
}

/// A compiled directive format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    template: String,
    methods: Vec<KeyMethod>,
}

impl LineFormat {
    /// Compile a directive format. Unknown `%` sequences are kept as literal text.
    pub fn compile(format: &str) -> Self {
        let mut template = String::with_capacity(format.len());
        let mut methods = Vec::new();
        let mut last = 0;

        for caps in FORMAT_RE.captures_iter(format) {
            let Some(whole) = caps.get(0) else { continue };
            let method = match (caps.get(2), caps.get(3)) {
                (Some(name), Some(kind)) => Directive::from_code(kind.as_str()).map(|directive| KeyMethod {
                    key: LineKey::group(directive.key_name(), name.as_str()),
                    directive,
                    arg: Some(name.as_str().to_string()),
                }),
                _ => Directive::from_code(&whole.as_str()[1..]).map(|directive| KeyMethod {
                    key: LineKey::field(directive.key_name()),
                    directive,
                    arg: None,
                }),
            };
            let Some(method) = method else { continue };

            template.push_str(&escape_literal(&format[last..whole.start()]));
            template.push_str("%s");
            methods.push(method);
            last = whole.end();
        }
        template.push_str(&escape_literal(&format[last..]));

        LineFormat { template, methods }
    }

    /// Positional template with one `%s` per directive.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn keys(&self) -> impl Iterator<Item = &LineKey> {
        self.methods.iter().map(|method| &method.key)
    }

    /// Evaluate every directive for one request. `now` is the completion time;
    /// the start time is derived from it and `elapsed`.
    pub fn format_line(
        &self,
        request: &AsyncRequest,
        response: &AsyncResponse,
        elapsed: Duration,
        now: DateTime<Utc>,
    ) -> Vec<LinePair> {
        self.methods
            .iter()
            .map(|method| {
                let value = evaluate(method, request, response, elapsed, now);
                (method.key.clone(), value)
            })
            .collect()
    }
}

fn evaluate(
    method: &KeyMethod,
    request: &AsyncRequest,
    response: &AsyncResponse,
    elapsed: Duration,
    now: DateTime<Utc>,
) -> String {
    let arg = method.arg.as_deref().unwrap_or_default();
    match method.directive {
        Directive::RemoteAddress => request.remote.clone().unwrap_or_else(|| "-".to_string()),
        Directive::RequestStartTime => {
            let start = chrono::Duration::from_std(elapsed)
                .ok()
                .and_then(|delta| now.checked_sub_signed(delta))
                .unwrap_or(now);
            start.format("[%d/%b/%Y:%H:%M:%S +0000]").to_string()
        }
        Directive::ProcessId => format!("<{}>", std::process::id()),
        Directive::FirstRequestLine => format!(
            "{} {} HTTP/{}.{}",
            request.method, request.path_qs, request.version.0, request.version.1
        ),
        Directive::ResponseStatus => response.status.to_string(),
        Directive::ResponseSize => response.body_length.to_string(),
        Directive::RequestTime => format!("{}", elapsed.as_secs_f64().round_ties_even()),
        Directive::RequestTimeFrac => format!("{:.6}", elapsed.as_secs_f64()),
        Directive::RequestTimeMicro => elapsed.as_micros().to_string(),
        Directive::RequestHeader => header(&request.headers, arg).unwrap_or("-").to_string(),
        Directive::ResponseHeader => header(&response.headers, arg).unwrap_or("-").to_string(),
        Directive::Environ => std::env::var(arg).unwrap_or_else(|_| "-".to_string()),
    }
}

/// Structured metadata for a line: plain keys map to their value, grouped keys
/// nest under their group (`{"request_header": {"User-Agent": "curl"}}`).
pub fn build_extra(pairs: &[LinePair]) -> Extra {
    let mut extra = Extra::new();
    for (key, value) in pairs {
        match key {
            LineKey::Field(name) => {
                extra.insert(name.clone(), Value::String(value.clone()));
            }
            LineKey::Group(group, name) => {
                let entry = extra
                    .entry(group.clone())
                    .or_insert_with(|| Value::Object(Extra::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Extra::new());
                }
                if let Value::Object(members) = entry {
                    members.insert(name.clone(), Value::String(value.clone()));
                }
            }
        }
    }
    extra
}

/// Render the pairs' values positionally and build the matching metadata.
pub fn render_line(template: &str, pairs: &[LinePair]) -> Result<(String, Extra), FormatError> {
    let values: Vec<&str> = pairs.iter().map(|(_, value)| value.as_str()).collect();
    let line = render_positional(template, &values[..])?;
    Ok((line, build_extra(pairs)))
}

pub struct AsyncAccessLogger<S> {
    format: LineFormat,
    colorizer: Colorizer,
    colorize_atoms: PairsHook,
    sink: S,
}

impl<S: AccessSink> AsyncAccessLogger<S> {
    /// Build a logger from `config.async_log_format`, deciding color support
    /// for stdout once.
    pub fn new(config: &LoggerConfig, sink: S) -> Self {
        let colorizer = Colorizer::detect(config.color, config.status_colors.clone());
        Self::with_colorizer(LineFormat::compile(&config.async_log_format), colorizer, sink)
    }

    pub fn with_colorizer(format: LineFormat, colorizer: Colorizer, sink: S) -> Self {
        Self {
            format,
            colorizer,
            colorize_atoms: Arc::new(|pairs: Vec<LinePair>| pairs),
            sink,
        }
    }

    pub fn with_atoms_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<LinePair>) -> Vec<LinePair> + Send + Sync + 'static,
    {
        self.colorize_atoms = Arc::new(hook);
        self
    }

    pub fn format(&self) -> &LineFormat {
        &self.format
    }

    pub fn colorizer(&self) -> &Colorizer {
        &self.colorizer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Write one access log entry for a finished request. Failures are
    /// reported through the sink's exception channel, never returned.
    pub fn log(&self, request: &AsyncRequest, response: &AsyncResponse, elapsed: Duration) -> AccessOutcome {
        let pairs = self.format.format_line(request, response, elapsed, Utc::now());
        self.emit(&response.status.to_string(), pairs)
    }

    /// Colorize and emit prepared pairs for a response with `status`.
    pub fn emit(&self, status: &str, pairs: Vec<LinePair>) -> AccessOutcome {
        let pairs = if self.colorizer.is_enabled() {
            (self.colorize_atoms)(pairs)
        } else {
            pairs
        };

        match render_line(self.format.template(), &pairs) {
            Ok((line, extra)) => {
                self.sink.info(&self.colorizer.colorize_msg(status, &line), Some(&extra));
                AccessOutcome::Logged
            }
            Err(err) => {
                self.sink.exception("Error in logging", &err);
                AccessOutcome::Failed(err)
            }
        }
    }
}

impl<S> fmt::Debug for AsyncAccessLogger<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAccessLogger")
            .field("format", &self.format)
            .field("colorizer", &self.colorizer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ASYNC_LOG_FORMAT;
    use crate::sink::MemorySink;
    use crate::status::StatusColors;
    use chrono::TimeZone;
    use serde_json::json;

    fn request() -> AsyncRequest {
        AsyncRequest {
            method: "GET".to_string(),
            path_qs: "/items?page=2".to_string(),
            version: (1, 1),
            remote: Some("127.0.0.1".to_string()),
            headers: vec![("token".to_string(), "x".to_string())],
        }
    }

    fn response(status: u16) -> AsyncResponse {
        AsyncResponse {
            status,
            body_length: 42,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
        }
    }

    #[test]
    fn test_compile_default_format() {
        let format = LineFormat::compile(DEFAULT_ASYNC_LOG_FORMAT);
        assert_eq!(format.template(), r#"%s %s "%s" %s %s "%s" "%s""#);
        assert_eq!(
            format.keys().cloned().collect::<Vec<_>>(),
            vec![
                LineKey::field("remote_address"),
                LineKey::field("request_start_time"),
                LineKey::field("first_request_line"),
                LineKey::field("response_status"),
                LineKey::field("response_size"),
                LineKey::group("request_header", "Referer"),
                LineKey::group("request_header", "User-Agent"),
            ]
        );
    }

    #[test]
    fn test_compile_escapes_literal_percent() {
        let format = LineFormat::compile("%s 100% %Tf %x");
        assert_eq!(format.template(), "%s 100%% %s %%x");
        assert_eq!(format.keys().count(), 2);
    }

    #[test]
    fn test_format_line_values() {
        let format = LineFormat::compile("%a %t %r %s %b %T %Tf %D %{Token}i %{content-type}o %{X}o");
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 2).unwrap();
        let pairs = format.format_line(&request(), &response(404), Duration::from_millis(1500), now);
        let values: Vec<&str> = pairs.iter().map(|(_, v)| v.as_str()).collect();

        assert_eq!(
            values,
            vec![
                "127.0.0.1",
                "[15/Jan/2024:10:30:00 +0000]",
                "GET /items?page=2 HTTP/1.1",
                "404",
                "42",
                "2",
                "1.500000",
                "1500000",
                "x",
                "text/plain",
                "-",
            ]
        );
    }

    #[test]
    fn test_request_time_rounds_half_to_even() {
        let format = LineFormat::compile("%T");
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 2).unwrap();
        let seconds = |elapsed: Duration| {
            format.format_line(&request(), &response(200), elapsed, now)[0].1.clone()
        };
        assert_eq!(seconds(Duration::from_millis(2500)), "2");
        assert_eq!(seconds(Duration::from_millis(3500)), "4");
        assert_eq!(seconds(Duration::from_millis(2600)), "3");
    }

    #[test]
    fn test_extra_from_pairs() {
        let pairs = vec![
            (LineKey::field("m"), "GET".to_string()),
            (LineKey::group("h", "token"), "x".to_string()),
        ];
        let (line, extra) = render_line("%s %s", &pairs).unwrap();
        assert_eq!(line, "GET x");
        assert_eq!(serde_json::Value::Object(extra), json!({"m": "GET", "h": {"token": "x"}}));
    }

    #[test]
    fn test_extra_merges_group_members() {
        let pairs = vec![
            (LineKey::group("request_header", "Referer"), "-".to_string()),
            (LineKey::group("request_header", "User-Agent"), "curl".to_string()),
        ];
        assert_eq!(
            serde_json::Value::Object(build_extra(&pairs)),
            json!({"request_header": {"Referer": "-", "User-Agent": "curl"}})
        );
    }

    #[test]
    fn test_log_colors_by_status() {
        let logger = AsyncAccessLogger::with_colorizer(
            LineFormat::compile("%r %s"),
            Colorizer::new(true, StatusColors::default()),
            MemorySink::new(),
        );
        assert!(logger.log(&request(), &response(503), Duration::ZERO).is_logged());

        let infos = logger.sink().infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].0, "\x1b[31mGET /items?page=2 HTTP/1.1 503\x1b[0m");
        assert_eq!(
            infos[0].1.clone().map(serde_json::Value::Object),
            Some(json!({"first_request_line": "GET /items?page=2 HTTP/1.1", "response_status": "503"}))
        );
    }

    #[test]
    fn test_hook_changing_arity_is_reported() {
        let logger = AsyncAccessLogger::with_colorizer(
            LineFormat::compile("%r %s"),
            Colorizer::new(true, StatusColors::default()),
            MemorySink::new(),
        )
        .with_atoms_hook(|mut pairs| {
            pairs.pop();
            pairs
        });

        let outcome = logger.log(&request(), &response(200), Duration::ZERO);
        assert_eq!(
            outcome,
            AccessOutcome::Failed(FormatError::ArgumentCount { expected: 2, got: 1 })
        );
        assert!(logger.sink().lines().is_empty());
        assert_eq!(logger.sink().errors().len(), 1);
    }
}
