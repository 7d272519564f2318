use std::path::PathBuf;

use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for settings provisioning.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No settings file was found searching from this base path. The message
    /// is the base path exactly as the caller supplied it.
    #[error("{}", .0.display())]
    AppSettingsNotFound(PathBuf),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
