//! Colorizing adapters, one per host shape.
//!
//! Both own a [`Colorizer`](crate::status::Colorizer) and report through an
//! [`AccessSink`](crate::sink::AccessSink); neither lets a failure escape to
//! the caller.

use crate::error::FormatError;

pub mod async_logger;
pub mod sync_logger;

/// What happened to one access event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    /// No destination configured; nothing was formatted.
    Skipped,
    /// A line went to the informational channel.
    Logged,
    /// Formatting failed; the diagnostic went to the error channel.
    Failed(FormatError),
}

impl AccessOutcome {
    pub fn is_logged(&self) -> bool {
        matches!(self, AccessOutcome::Logged)
    }
}
