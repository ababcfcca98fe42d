#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Incomplete format directive at offset {offset}")]
    Incomplete { offset: usize },

    #[error("Incomplete format key at offset {offset}")]
    UnterminatedKey { offset: usize },

    #[error("Unsupported format character '{ch}' at offset {offset}")]
    UnsupportedConversion { ch: char, offset: usize },

    #[error("Format requires a mapping, found positional directive at offset {offset}")]
    PositionalDirective { offset: usize },

    #[error("Field width or precision too large at offset {offset}")]
    WidthTooLarge { offset: usize },

    #[error("%d format: a number is required for atom '{key}', not '{value}'")]
    NotANumber { key: String, value: String },

    #[error("Wrong number of arguments for format string: expected {expected}, got {got}")]
    ArgumentCount { expected: usize, got: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid status color '{0}': expected DIGIT=STYLE, e.g. 2=green")]
    InvalidStatusColor(String),

    #[error("Unknown color or attribute: {0}")]
    UnknownStyle(String),
}
