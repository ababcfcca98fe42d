//! Request/response shapes handed to the completion hooks of each host.
//!
//! All types deserialize from JSON so recorded events can be replayed
//! through the CLI.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub type Headers = Vec<(String, String)>;

/// CGI-style environment of a synchronous request (`REQUEST_METHOD`, `PATH_INFO`, ...).
pub type Environ = IndexMap<String, String>;

/// Response as seen by the synchronous hook once the body has been sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncResponse {
    /// Status line, e.g. `"200 OK"` or just `"200"`.
    pub status: String,
    #[serde(default)]
    pub headers: Headers,
    /// Bytes written, if the host tracked them.
    #[serde(default)]
    pub sent: Option<u64>,
}

impl SyncResponse {
    /// Numeric part of the status line.
    pub fn status_code(&self) -> &str {
        self.status.split_whitespace().next().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub headers: Headers,
}

/// One replayable event for the synchronous adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncEvent {
    pub response: SyncResponse,
    #[serde(default)]
    pub request: SyncRequest,
    #[serde(default)]
    pub environ: Environ,
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub request_time: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AsyncRequest {
    pub method: String,
    /// Path including the query string.
    pub path_qs: String,
    #[serde(default = "default_version")]
    pub version: (u8, u8),
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub headers: Headers,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AsyncResponse {
    pub status: u16,
    #[serde(default)]
    pub body_length: u64,
    #[serde(default)]
    pub headers: Headers,
}

/// One replayable event for the asynchronous adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct AsyncEvent {
    pub request: AsyncRequest,
    pub response: AsyncResponse,
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub elapsed: Duration,
}

/// Case-insensitive header lookup, first match wins.
pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn default_version() -> (u8, u8) {
    (1, 1)
}

/// Accepts either seconds as a number (`0.25`) or a humantime string (`"250ms"`).
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) if secs.is_finite() && secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
        Raw::Seconds(secs) => Err(serde::de::Error::custom(format!(
            "duration must be a non-negative number of seconds, got {}",
            secs
        ))),
        Raw::Text(text) => humantime::parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
