use crate::error::ConfigError;
use serde::Deserialize;
use std::str::FromStr;

pub const RESET: &str = "\x1b[0m";

/// Terminal colors, usable as foreground or background (highlight).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Grey,
}

impl Color {
    pub fn fg_code(self) -> u8 {
        match self {
            Color::Black => 30,
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
            Color::Magenta => 35,
            Color::Cyan => 36,
            Color::White => 37,
            Color::Grey => 90,
        }
    }

    pub fn bg_code(self) -> u8 {
        self.fg_code() + 10
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),
            "grey" | "gray" => Ok(Color::Grey),
            _ => Err(ConfigError::UnknownStyle(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Bold,
    Dark,
    Underline,
    Blink,
    Reverse,
    Concealed,
}

impl Attribute {
    pub fn code(self) -> u8 {
        match self {
            Attribute::Bold => 1,
            Attribute::Dark => 2,
            Attribute::Underline => 4,
            Attribute::Blink => 5,
            Attribute::Reverse => 7,
            Attribute::Concealed => 8,
        }
    }
}

impl FromStr for Attribute {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bold" => Ok(Attribute::Bold),
            "dark" => Ok(Attribute::Dark),
            "underline" => Ok(Attribute::Underline),
            "blink" => Ok(Attribute::Blink),
            "reverse" => Ok(Attribute::Reverse),
            "concealed" => Ok(Attribute::Concealed),
            _ => Err(ConfigError::UnknownStyle(s.to_string())),
        }
    }
}

/// A color treatment: optional foreground, optional highlight and text attributes.
///
/// In YAML a style is either a bare color name (`green`) or a mapping
/// (`{ color: red, on_color: white, attrs: [bold] }`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "StyleSpec")]
pub struct ColorStyle {
    pub color: Option<Color>,
    pub on_color: Option<Color>,
    pub attrs: Vec<Attribute>,
}

impl ColorStyle {
    pub fn fg(color: Color) -> Self {
        Self {
            color: Some(color),
            ..Self::default()
        }
    }

    pub fn on(mut self, color: Color) -> Self {
        self.on_color = Some(color);
        self
    }

    pub fn attr(mut self, attr: Attribute) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn is_plain(&self) -> bool {
        self.color.is_none() && self.on_color.is_none() && self.attrs.is_empty()
    }

    /// Wrap `text` in the escape codes of this style followed by a reset.
    /// A plain style returns the text untouched.
    pub fn paint(&self, text: &str) -> String {
        if self.is_plain() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len() + 16);
        if let Some(color) = self.color {
            out.push_str(&format!("\x1b[{}m", color.fg_code()));
        }
        if let Some(color) = self.on_color {
            out.push_str(&format!("\x1b[{}m", color.bg_code()));
        }
        for attr in &self.attrs {
            out.push_str(&format!("\x1b[{}m", attr.code()));
        }
        out.push_str(text);
        out.push_str(RESET);
        out
    }
}

/// Parses `red`, `red+bold`, `red/white` (on white) or `red/white+bold+underline`.
impl FromStr for ColorStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('+');
        let colors = parts.next().unwrap_or_default().trim();

        let mut style = ColorStyle::default();
        if !colors.is_empty() {
            let (fg, bg) = match colors.split_once('/') {
                Some((fg, bg)) => (fg, Some(bg)),
                None => (colors, None),
            };
            if !fg.is_empty() {
                style.color = Some(fg.parse()?);
            }
            if let Some(bg) = bg {
                style.on_color = Some(bg.parse()?);
            }
        }
        for attr in parts {
            style.attrs.push(attr.trim().parse()?);
        }
        Ok(style)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StyleSpec {
    Name(Color),
    Full {
        #[serde(default)]
        color: Option<Color>,
        #[serde(default)]
        on_color: Option<Color>,
        #[serde(default)]
        attrs: Vec<Attribute>,
    },
}

impl From<StyleSpec> for ColorStyle {
    fn from(spec: StyleSpec) -> Self {
        match spec {
            StyleSpec::Name(color) => ColorStyle::fg(color),
            StyleSpec::Full {
                color,
                on_color,
                attrs,
            } => ColorStyle {
                color,
                on_color,
                attrs,
            },
        }
    }
}

/// Returns true if `text` contains an ANSI CSI escape introducer.
pub fn has_escapes(text: &str) -> bool {
    text.contains("\x1b[")
}
