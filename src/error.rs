use thiserror::Error;

/// Classifies profile validation failures for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileErrorKind {
    /// Input was empty or carried nothing parseable
    Empty,
    /// No `custom_proxy_group=` line survived parsing
    NoProxyGroups,
    /// None of the declared groups can serve as the main selector
    MissingMainGroup,
}

/// Subscription engine error types
#[derive(Error, Debug)]
pub enum SubError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid profile: {message}")]
    InvalidProfile {
        kind: ProfileErrorKind,
        message: String,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, SubError>;
