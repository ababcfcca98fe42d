//! Access logger for synchronous hosts: named atoms into a `%(atom)s` format.

use crate::adapters::AccessOutcome;
use crate::atoms::{Atoms, SafeAtoms};
use crate::config::LoggerConfig;
use crate::event::{Environ, SyncRequest, SyncResponse};
use crate::sink::AccessSink;
use crate::status::Colorizer;
use crate::template;
use chrono::{DateTime, FixedOffset, Local};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Per-atom colorizing step. Receives the wrapped atoms and returns the set to
/// substitute. Only runs while color output is enabled.
pub type AtomsHook = Arc<dyn Fn(SafeAtoms) -> SafeAtoms + Send + Sync>;

pub struct SyncAccessLogger<S> {
    config: LoggerConfig,
    colorizer: Colorizer,
    colorize_atoms: AtomsHook,
    sink: S,
}

impl<S: AccessSink> SyncAccessLogger<S> {
    /// Build a logger, deciding color support for stdout once.
    pub fn new(config: LoggerConfig, sink: S) -> Self {
        let colorizer = Colorizer::detect(config.color, config.status_colors.clone());
        Self::with_colorizer(config, colorizer, sink)
    }

    pub fn with_colorizer(config: LoggerConfig, colorizer: Colorizer, sink: S) -> Self {
        Self {
            config,
            colorizer,
            colorize_atoms: Arc::new(|atoms: SafeAtoms| atoms),
            sink,
        }
    }

    pub fn with_atoms_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(SafeAtoms) -> SafeAtoms + Send + Sync + 'static,
    {
        self.colorize_atoms = Arc::new(hook);
        self
    }

    pub fn colorizer(&self) -> &Colorizer {
        &self.colorizer
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Collect the atoms for one request, stamped with the current local time.
    pub fn atoms(
        &self,
        resp: &SyncResponse,
        req: &SyncRequest,
        environ: &Environ,
        request_time: Duration,
    ) -> Atoms {
        let now: DateTime<FixedOffset> = Local::now().into();
        standard_atoms(resp, req, environ, request_time, &now)
    }

    /// Write one access log entry. Never panics and never returns an error:
    /// formatting problems are reported on the sink's error channel.
    pub fn access(
        &self,
        resp: &SyncResponse,
        req: &SyncRequest,
        environ: &Environ,
        request_time: Duration,
    ) -> AccessOutcome {
        if !self.config.has_destination() {
            return AccessOutcome::Skipped;
        }

        let atoms = self.atoms(resp, req, environ, request_time);
        self.log_atoms(atoms)
    }

    /// Format, colorize and emit an already collected atom set.
    pub fn log_atoms(&self, atoms: Atoms) -> AccessOutcome {
        let status = atoms.get("s").cloned().unwrap_or_default();

        let mut safe_atoms = SafeAtoms::new(atoms);
        if self.colorizer.is_enabled() {
            safe_atoms = (self.colorize_atoms)(safe_atoms);
        }

        match template::substitute(&self.config.access_log_format, &safe_atoms) {
            Ok(msg) => {
                self.sink.info(&self.colorizer.colorize_msg(&status, &msg), None);
                AccessOutcome::Logged
            }
            Err(err) => {
                self.sink.error(&format!(
                    "Error formatting access log line with {:?}: {}",
                    self.config.access_log_format, err
                ));
                AccessOutcome::Failed(err)
            }
        }
    }
}

impl<S> fmt::Debug for SyncAccessLogger<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncAccessLogger")
            .field("config", &self.config)
            .field("colorizer", &self.colorizer)
            .finish_non_exhaustive()
    }
}

/// The standard atom set for a synchronous request.
///
/// | atom | value |
/// |------|-------|
/// | `h` | remote address |
/// | `l` | `-` |
/// | `u` | remote user |
/// | `t` | date of the request |
/// | `r` | request line, e.g. `GET /path HTTP/1.1` |
/// | `m` `U` `q` `H` | method, path, query string, protocol |
/// | `s` | status code |
/// | `b` / `B` | response length, `-` / `0` when unknown |
/// | `f` / `a` | referer, user agent |
/// | `T` `M` `D` | request time in seconds, milliseconds, microseconds |
/// | `L` | request time as decimal seconds |
/// | `p` | process id |
/// | `{name}i` `{name}o` `{name}e` | request header, response header, environ variable |
///
/// Atoms whose source is missing from `environ` are left out, so they render
/// as the placeholder.
pub fn standard_atoms(
    resp: &SyncResponse,
    req: &SyncRequest,
    environ: &Environ,
    request_time: Duration,
    now: &DateTime<FixedOffset>,
) -> Atoms {
    let env = |key: &str| environ.get(key).map(String::as_str);
    let or_dash = |key: &str| env(key).unwrap_or("-").to_string();

    let mut atoms = Atoms::new();
    atoms.insert("h".into(), or_dash("REMOTE_ADDR"));
    atoms.insert("l".into(), "-".into());
    atoms.insert("u".into(), or_dash("REMOTE_USER"));
    atoms.insert("t".into(), now.format("[%d/%b/%Y:%H:%M:%S %z]").to_string());
    atoms.insert("r".into(), request_line(environ));
    atoms.insert("s".into(), resp.status_code().to_string());
    for (atom, key) in [
        ("m", "REQUEST_METHOD"),
        ("U", "PATH_INFO"),
        ("q", "QUERY_STRING"),
        ("H", "SERVER_PROTOCOL"),
    ] {
        if let Some(value) = env(key) {
            atoms.insert(atom.into(), value.to_string());
        }
    }
    atoms.insert(
        "b".into(),
        resp.sent.map_or_else(|| "-".to_string(), |sent| sent.to_string()),
    );
    atoms.insert("B".into(), resp.sent.unwrap_or(0).to_string());
    atoms.insert("f".into(), or_dash("HTTP_REFERER"));
    atoms.insert("a".into(), or_dash("HTTP_USER_AGENT"));
    atoms.insert("T".into(), request_time.as_secs().to_string());
    atoms.insert("M".into(), request_time.as_millis().to_string());
    atoms.insert("D".into(), request_time.as_micros().to_string());
    atoms.insert(
        "L".into(),
        format!("{}.{:06}", request_time.as_secs(), request_time.subsec_micros()),
    );
    atoms.insert("p".into(), format!("<{}>", std::process::id()));

    for (name, value) in &req.headers {
        atoms.insert(format!("{{{}}}i", name.to_lowercase()), value.clone());
    }
    for (name, value) in &resp.headers {
        atoms.insert(format!("{{{}}}o", name.to_lowercase()), value.clone());
    }
    for (name, value) in environ {
        atoms.insert(format!("{{{}}}e", name.to_lowercase()), value.clone());
    }
    atoms
}

fn request_line(environ: &Environ) -> String {
    let get = |key: &str| environ.get(key).map(String::as_str);

    let uri = match get("RAW_URI") {
        Some(raw) => raw.to_string(),
        None => {
            let path = get("PATH_INFO").unwrap_or("-");
            match get("QUERY_STRING") {
                Some(query) if !query.is_empty() => format!("{}?{}", path, query),
                _ => path.to_string(),
            }
        }
    };

    format!(
        "{} {} {}",
        get("REQUEST_METHOD").unwrap_or("-"),
        uri,
        get("SERVER_PROTOCOL").unwrap_or("-")
    )
}
