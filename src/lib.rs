// src/lib.rs
pub mod adapters;
pub mod atoms;
pub mod colors;
pub mod config;
pub mod error;
pub mod event;
pub mod sink;
pub mod status;
pub mod template;
pub mod tty;

pub use error::*;

pub use adapters::async_logger::{AsyncAccessLogger, LineFormat, LineKey, LinePair};
pub use adapters::sync_logger::SyncAccessLogger;
pub use adapters::AccessOutcome;
pub use atoms::{Atoms, SafeAtoms, PLACEHOLDER};
pub use colors::{Attribute, Color, ColorStyle};
pub use config::LoggerConfig;
pub use sink::{AccessSink, Extra, MemorySink, TracingSink, WriterSink};
pub use status::{Colorizer, StatusColors};
pub use tty::{supports_color, ColorChoice, ColorProbe};
