use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required settings file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read settings file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("environment source with prefix '{prefix}' has an empty separator")]
    EmptyEnvSeparator { prefix: String },

    #[error("cannot bind settings key '{key}': {message}")]
    BindingError { key: String, message: String },
}

impl ConfigError {
    /// Returns true for a document that exists but is not well-formed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, ConfigError::ParseError { .. })
    }

    /// Returns true for a value that could not be converted to its target type.
    pub fn is_binding_error(&self) -> bool {
        matches!(self, ConfigError::BindingError { .. })
    }
}
