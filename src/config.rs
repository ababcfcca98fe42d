use crate::error::ConfigError;
use crate::status::StatusColors;
use crate::tty::ColorChoice;
use serde::Deserialize;
use std::path::Path;

/// Named-atom format used by the synchronous adapter.
pub const DEFAULT_ACCESS_LOG_FORMAT: &str =
    r#"%(h)s %(l)s %(u)s %(t)s "%(r)s" %(s)s %(b)s "%(f)s" "%(a)s""#;

/// Directive format used by the asynchronous adapter.
pub const DEFAULT_ASYNC_LOG_FORMAT: &str = r#"%a %t "%r" %s %b "%{Referer}i" "%{User-Agent}i""#;

/// Configuration for the access loggers
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    /// Access log destination (`-` for stdout). Part of the "is anything configured" check.
    pub access_log: Option<String>,
    /// Host logging configuration file, if the host uses one.
    pub log_config: Option<String>,
    pub syslog: bool,
    pub access_log_format: String,
    pub async_log_format: String,
    pub color: ColorChoice,
    /// Replaces the whole default table when present.
    pub status_colors: StatusColors,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            access_log: None,
            log_config: None,
            syslog: false,
            access_log_format: DEFAULT_ACCESS_LOG_FORMAT.to_string(),
            async_log_format: DEFAULT_ASYNC_LOG_FORMAT.to_string(),
            color: ColorChoice::Auto,
            status_colors: StatusColors::default(),
        }
    }
}

impl LoggerConfig {
    /// True when at least one access log destination is configured.
    pub fn has_destination(&self) -> bool {
        self.access_log.is_some() || self.log_config.is_some() || self.syslog
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{Color, ColorStyle};

    #[test]
    fn test_default_has_no_destination() {
        let config = LoggerConfig::default();
        assert!(!config.has_destination());
        assert_eq!(config.color, ColorChoice::Auto);
        assert_eq!(config.access_log_format, DEFAULT_ACCESS_LOG_FORMAT);
    }

    #[test]
    fn test_any_destination_counts() {
        let mut config = LoggerConfig::default();
        config.syslog = true;
        assert!(config.has_destination());

        let mut config = LoggerConfig::default();
        config.log_config = Some("logging.ini".to_string());
        assert!(config.has_destination());
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = LoggerConfig::from_yaml_str(
            "access_log: '-'\ncolor: always\nstatus_colors:\n  '2': blue\n",
        )
        .unwrap();
        assert_eq!(config.access_log.as_deref(), Some("-"));
        assert_eq!(config.color, ColorChoice::Always);
        assert_eq!(config.status_colors.style_for("200"), Some(&ColorStyle::fg(Color::Blue)));
        assert_eq!(config.status_colors.style_for("500"), None);
        assert_eq!(config.async_log_format, DEFAULT_ASYNC_LOG_FORMAT);
    }

    #[test]
    fn test_yaml_unknown_field_rejected() {
        assert!(matches!(
            LoggerConfig::from_yaml_str("colour: always"),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = LoggerConfig::load(Path::new("/nonexistent/access-color.yaml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
