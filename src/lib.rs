//! Typed application settings from the nearest `appsettings` file.
//!
//! [`SettingsFactory`] searches upward from a base path for
//! `appsettings.json` (or `appsettings.toml`), layers an optional overlay
//! file and `APPSETTINGS__*` environment variables on top, and binds one
//! section onto a `serde` type.

pub mod binder;
pub mod config;
mod error;
pub mod factory;
pub mod search;

pub use binder::{bind_section, SectionBinder, SectionConfigurator};
pub use config::{ConfigError, ConfigurationRoot};
pub use error::Error;
pub use factory::{SettingsConfiguration, SettingsFactory};
pub use search::{AppSettingsSearchResult, DirectorySearch, SearchPolicy};

use serde::de::DeserializeOwned;

/// Loads a settings section with the default search, root factory, and binder.
pub fn create_settings<T>(config: &SettingsConfiguration) -> Result<T, Error>
where
    T: DeserializeOwned + Default,
{
    SettingsFactory::new().create_settings(config)
}
