//! Error types for the selector engine crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SelectorError>;

/// Errors raised while parsing, compiling or executing a selector.
///
/// Grammar failures (`Syntax`, `UnsupportedPseudo`, `NthArgument`, `UnsupportedLang`) are
/// fatal for the query that produced them. `Host` errors come from host-provided lookup
/// primitives and are downgraded to a fast-path miss by the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectorError {
    #[error("Syntax error, unrecognized expression: {0}")]
    Syntax(String),

    #[error("Syntax error, unsupported pseudo: {0}")]
    UnsupportedPseudo(String),

    #[error("Syntax error, {0} requires an argument")]
    NthArgument(String),

    #[error("Syntax error, unsupported lang: {0}")]
    UnsupportedLang(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SelectorError {
    /// Whether the error came from the query grammar rather than the host or configuration.
    pub fn is_grammar_error(&self) -> bool {
        matches!(
            self,
            SelectorError::Syntax(_)
                | SelectorError::UnsupportedPseudo(_)
                | SelectorError::NthArgument(_)
                | SelectorError::UnsupportedLang(_)
        )
    }
}

impl From<regex::Error> for SelectorError {
    fn from(err: regex::Error) -> Self {
        SelectorError::InvalidPattern(err.to_string())
    }
}

impl From<std::io::Error> for SelectorError {
    fn from(err: std::io::Error) -> Self {
        SelectorError::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for SelectorError {
    fn from(err: serde_yaml::Error) -> Self {
        SelectorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SelectorError {
    fn from(err: serde_json::Error) -> Self {
        SelectorError::Config(err.to_string())
    }
}
