//! Status category to color mapping, and the colorizer shared by both adapters.

use crate::colors::{Color, ColorStyle};
use crate::error::ConfigError;
use crate::tty::{ColorChoice, ColorProbe};
use indexmap::IndexMap;
use serde::Deserialize;

/// Leading character of a status code, e.g. `'4'` for `"404"`.
pub fn category(status: &str) -> Option<char> {
    status.chars().next()
}

/// Mapping of status category to color treatment. Replace or extend the
/// table to change coloring; categories without an entry stay uncolored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StatusColors(IndexMap<char, ColorStyle>);

impl Default for StatusColors {
    fn default() -> Self {
        Self::from_iter([
            ('1', ColorStyle::fg(Color::Yellow)),
            ('2', ColorStyle::fg(Color::Green)),
            ('3', ColorStyle::fg(Color::Cyan)),
            ('4', ColorStyle::fg(Color::Magenta)),
            ('5', ColorStyle::fg(Color::Red)),
        ])
    }
}

impl FromIterator<(char, ColorStyle)> for StatusColors {
    fn from_iter<I: IntoIterator<Item = (char, ColorStyle)>>(iter: I) -> Self {
        StatusColors(iter.into_iter().collect())
    }
}

impl StatusColors {
    pub fn empty() -> Self {
        StatusColors(IndexMap::new())
    }

    pub fn insert(&mut self, category: char, style: ColorStyle) -> Option<ColorStyle> {
        self.0.insert(category, style)
    }

    pub fn remove(&mut self, category: char) -> Option<ColorStyle> {
        self.0.shift_remove(&category)
    }

    pub fn get(&self, category: char) -> Option<&ColorStyle> {
        self.0.get(&category)
    }

    /// Style for a full status code string.
    pub fn style_for(&self, status: &str) -> Option<&ColorStyle> {
        category(status).and_then(|c| self.get(c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&char, &ColorStyle)> {
        self.0.iter()
    }

    /// Apply a `DIGIT=STYLE` override such as `2=blue` or `5=red+bold`.
    pub fn apply_override(&mut self, entry: &str) -> Result<(), ConfigError> {
        let (digit, style) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidStatusColor(entry.to_string()))?;

        let mut chars = digit.trim().chars();
        let category = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() => c,
            _ => return Err(ConfigError::InvalidStatusColor(entry.to_string())),
        };

        self.insert(category, style.trim().parse()?);
        Ok(())
    }
}

/// Capability flag plus status table. Both adapters own one of these.
#[derive(Debug, Clone)]
pub struct Colorizer {
    enabled: bool,
    mapping: StatusColors,
}

impl Colorizer {
    pub fn new(enabled: bool, mapping: StatusColors) -> Self {
        Self { enabled, mapping }
    }

    /// Resolve `choice` against stdout once, at construction.
    pub fn detect(choice: ColorChoice, mapping: StatusColors) -> Self {
        let enabled = choice.resolve(|| ColorProbe::stdout().supports_color());
        Self::new(enabled, mapping)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mapping(&self) -> &StatusColors {
        &self.mapping
    }

    /// Colorize the message depending on the HTTP status category.
    pub fn colorize_msg(&self, code: &str, msg: &str) -> String {
        if !self.enabled {
            return msg.to_string();
        }
        match self.mapping.style_for(code) {
            Some(style) => style.paint(msg),
            None => msg.to_string(),
        }
    }
}
