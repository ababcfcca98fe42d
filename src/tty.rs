//! Color capability detection for the access log output stream.

use is_terminal::IsTerminal;
use serde::Deserialize;
use std::env;

/// Whether to colorize: detect from the output stream, or force on/off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    #[value(help = "Color when writing to an ANSI-capable terminal")]
    Auto,
    #[value(help = "Always emit color escapes")]
    Always,
    #[value(help = "Never emit color escapes")]
    Never,
}

impl ColorChoice {
    /// Resolve the choice to a flag. The probe only runs for `Auto`.
    pub fn resolve<F: FnOnce() -> bool>(self, probe: F) -> bool {
        match self {
            ColorChoice::Auto => probe(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// Everything the capability decision depends on, captured once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorProbe {
    /// Platform identifier as reported by `std::env::consts::OS`.
    pub os: String,
    /// `ANSICON` is present, which enables escapes on Windows consoles.
    pub ansicon: bool,
    /// `ANSI_COLORS_DISABLED` or `NO_COLOR` is present.
    pub colors_disabled: bool,
    /// `None` when the stream cannot be asked whether it is a terminal.
    pub is_tty: Option<bool>,
}

impl ColorProbe {
    pub fn from_env(is_tty: Option<bool>) -> Self {
        Self {
            os: env::consts::OS.to_string(),
            ansicon: env::var_os("ANSICON").is_some(),
            colors_disabled: env::var_os("ANSI_COLORS_DISABLED").is_some()
                || env::var_os("NO_COLOR").is_some(),
            is_tty,
        }
    }

    pub fn for_stream<S: IsTerminal>(stream: &S) -> Self {
        Self::from_env(Some(stream.is_terminal()))
    }

    pub fn stdout() -> Self {
        Self::for_stream(&std::io::stdout())
    }

    pub fn supported_platform(&self) -> bool {
        self.os != "windows" || self.ansicon
    }

    pub fn supports_color(&self) -> bool {
        !self.colors_disabled && self.supported_platform() && self.is_tty == Some(true)
    }
}

/// Determine if stdout supports ANSI colors.
pub fn supports_color() -> bool {
    ColorProbe::stdout().supports_color()
}
