use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const SYNC_EVENT: &str = r#"{"response": {"status": "200 OK", "sent": 1024}, "environ": {"REQUEST_METHOD": "GET", "PATH_INFO": "/my/path", "SERVER_PROTOCOL": "HTTP/1.1"}, "request_time": 0.25}"#;
const NOT_FOUND_EVENT: &str = r#"{"response": {"status": "404 Not Found"}, "environ": {"REQUEST_METHOD": "GET", "PATH_INFO": "/gone"}}"#;
const ASYNC_EVENT: &str = r#"{"request": {"method": "GET", "path_qs": "/", "headers": [["token", "x"]]}, "response": {"status": 404}, "elapsed": "3ms"}"#;

fn access_color() -> Command {
    let mut cmd = Command::cargo_bin("access-color").unwrap();
    cmd.env_remove("ACCESS_COLOR_LOG");
    cmd
}

#[test]
fn test_plain_output_with_custom_format() {
    access_color()
        .arg("--no-color")
        .arg("--format")
        .arg("%(m)s %(U)s %(s)s %(b)s %(u)s")
        .write_stdin(format!("{}\n{}\n", SYNC_EVENT, NOT_FOUND_EVENT))
        .assert()
        .success()
        .stdout("GET /my/path 200 1024 -\nGET /gone 404 - -\n");
}

#[test]
fn test_forced_color() {
    access_color()
        .arg("--color")
        .arg("--format")
        .arg("%(s)s")
        .write_stdin(format!("{}\n{}\n", SYNC_EVENT, NOT_FOUND_EVENT))
        .assert()
        .success()
        .stdout("\x1b[32m200\x1b[0m\n\x1b[35m404\x1b[0m\n");
}

#[test]
fn test_auto_color_is_off_for_pipes() {
    access_color()
        .write_stdin(format!("{}\n", SYNC_EVENT))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"GET /my/path HTTP/1.1\" 200 1024"))
        .stdout(predicate::str::contains("\x1b[").not());
}

#[test]
fn test_status_color_override() {
    access_color()
        .arg("--color")
        .arg("--status-color")
        .arg("2=blue+bold")
        .arg("--format")
        .arg("%(s)s")
        .write_stdin(format!("{}\n", SYNC_EVENT))
        .assert()
        .success()
        .stdout("\x1b[34m\x1b[1m200\x1b[0m\n");
}

#[test]
fn test_invalid_status_color_is_rejected() {
    access_color()
        .arg("--status-color")
        .arg("green")
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid status color 'green'"));
}

#[test]
fn test_async_flavor_with_extra() {
    access_color()
        .arg("--flavor")
        .arg("async")
        .arg("--no-color")
        .arg("--extra")
        .arg("--format")
        .arg("%r %s %{token}i")
        .write_stdin(format!("{}\n", ASYNC_EVENT))
        .assert()
        .success()
        .stdout(
            "GET / HTTP/1.1 404 x\t{\"first_request_line\":\"GET / HTTP/1.1\",\"response_status\":\"404\",\"request_header\":{\"token\":\"x\"}}\n",
        );
}

#[test]
fn test_unparseable_event_is_skipped() {
    access_color()
        .arg("--no-color")
        .arg("--format")
        .arg("%(s)s")
        .write_stdin(format!("not json\n{}\n", SYNC_EVENT))
        .assert()
        .code(1)
        .stdout("200\n")
        .stderr(predicate::str::contains("Skipping unparseable event"));
}

#[test]
fn test_fail_fast_stops_at_bad_event() {
    access_color()
        .arg("--fail-fast")
        .arg("--format")
        .arg("%(s)s")
        .write_stdin(format!("{{}}\n{}\n", SYNC_EVENT))
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Invalid event on line 1"));
}

#[test]
fn test_malformed_format_reports_error() {
    access_color()
        .arg("--format")
        .arg("%(s)s %(")
        .write_stdin(format!("{}\n", SYNC_EVENT))
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Error formatting access log line"));
}

#[test]
fn test_config_file_and_input_file() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "color: always").unwrap();
    writeln!(config, "access_log_format: '%(m)s %(s)s'").unwrap();
    writeln!(config, "status_colors:").unwrap();
    writeln!(config, "  '2': {{ color: yellow, on_color: black }}").unwrap();

    let mut input = NamedTempFile::new().unwrap();
    writeln!(input, "{}", SYNC_EVENT).unwrap();
    writeln!(input).unwrap();
    writeln!(input, "{}", NOT_FOUND_EVENT).unwrap();

    access_color()
        .arg("-c")
        .arg(config.path())
        .arg(input.path())
        .assert()
        .success()
        .stdout("\x1b[33m\x1b[40mGET 200\x1b[0m\nGET 404\n");
}

#[test]
fn test_missing_input_file() {
    access_color()
        .arg("/nonexistent/events.jsonl")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to open input file"));
}
