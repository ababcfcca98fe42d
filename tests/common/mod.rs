#![allow(dead_code)]

use access_color::event::{AsyncRequest, AsyncResponse, Environ, SyncRequest, SyncResponse};
use access_color::{Colorizer, LoggerConfig, MemorySink, StatusColors, SyncAccessLogger};
use std::time::Duration;

pub const ESC: &str = "\x1b[";
pub const RESET: &str = "\x1b[0m";

/// A finished `GET /my/path?foo=bar` answered with `200 OK` and 1024 bytes.
pub fn access_args() -> (SyncResponse, SyncRequest, Environ, Duration) {
    let response = SyncResponse {
        status: "200 OK".to_string(),
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        sent: Some(1024),
    };
    let request = SyncRequest {
        headers: vec![("Accept".to_string(), "application/json".to_string())],
    };
    let environ: Environ = [
        ("REQUEST_METHOD", "GET"),
        ("RAW_URI", "/my/path?foo=bar"),
        ("PATH_INFO", "/my/path"),
        ("QUERY_STRING", "foo=bar"),
        ("SERVER_PROTOCOL", "HTTP/1.1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    (response, request, environ, Duration::new(1, 2_000))
}

pub fn stdout_config(format: &str) -> LoggerConfig {
    LoggerConfig {
        access_log: Some("-".to_string()),
        access_log_format: format.to_string(),
        ..LoggerConfig::default()
    }
}

pub fn sync_logger(color: bool, format: &str) -> SyncAccessLogger<MemorySink> {
    SyncAccessLogger::with_colorizer(
        stdout_config(format),
        Colorizer::new(color, StatusColors::default()),
        MemorySink::new(),
    )
}

pub fn async_request() -> AsyncRequest {
    AsyncRequest {
        method: "GET".to_string(),
        path_qs: "/".to_string(),
        version: (1, 1),
        remote: None,
        headers: vec![("token".to_string(), "x".to_string())],
    }
}

pub fn async_response(status: u16) -> AsyncResponse {
    AsyncResponse {
        status,
        body_length: 0,
        headers: Vec::new(),
    }
}
