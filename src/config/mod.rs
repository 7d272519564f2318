//! Building layered configuration roots from settings files and the environment.

mod builder;
mod env;
mod error;
mod file;
mod root;
mod source;

pub use builder::{
    overlay_path, AppSettingsRootFactory, ConfigurationBuilder, ConfigurationRootFactory,
};
pub use env::{EnvSource, DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR};
pub use error::ConfigError;
pub use file::{FileFormat, FileSource};
pub use root::ConfigurationRoot;
pub use source::{ConfigEntry, ConfigSource};
