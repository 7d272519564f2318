//! Turning a [`SettingsConfiguration`] into a typed settings value.

mod locator;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::binder::{SectionBinder, SectionConfigurator};
use crate::config::{AppSettingsRootFactory, ConfigurationRootFactory};
use crate::search::{AppSettingsSearch, DirectorySearch};
use crate::Error;

pub use locator::{FixedPathLocator, HomeDirectoryLocator, PathLocator, WorkingDirectoryLocator};

/// What to load: which section, which overlay, and where to start looking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsConfiguration {
    section_key: String,
    overlay_name: Option<String>,
    base_path: PathBuf,
}

impl SettingsConfiguration {
    /// An empty `overlay_name` means no overlay; an empty `base_path` lets
    /// the factory's [`PathLocator`] pick the starting directory.
    pub fn new(
        section_key: impl Into<String>,
        overlay_name: impl Into<String>,
        base_path: impl Into<PathBuf>,
    ) -> Self {
        let overlay_name = overlay_name.into();
        Self {
            section_key: section_key.into(),
            overlay_name: (!overlay_name.is_empty()).then_some(overlay_name),
            base_path: base_path.into(),
        }
    }

    pub fn section_key(&self) -> &str {
        &self.section_key
    }

    pub fn overlay_name(&self) -> Option<&str> {
        self.overlay_name.as_deref()
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// Resolves the settings file, builds its configuration root, and binds a
/// section of it.
///
/// Each collaborator can be swapped through [`SettingsFactory::from_parts`].
///
/// ## Example
///
/// ```no_run
/// use serde::Deserialize;
/// use settings_provisioning::{SettingsConfiguration, SettingsFactory};
///
/// #[derive(Debug, Default, Deserialize)]
/// #[serde(default)]
/// struct Smtp {
///     host: String,
///     port: u16,
/// }
///
/// let config = SettingsConfiguration::new("Smtp", "Development", "");
/// let smtp: Smtp = SettingsFactory::new().create_settings(&config)?;
/// # Ok::<(), settings_provisioning::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SettingsFactory<
    S = DirectorySearch,
    R = AppSettingsRootFactory,
    B = SectionConfigurator,
    L = WorkingDirectoryLocator,
> {
    search: S,
    roots: R,
    binder: B,
    locator: L,
}

impl SettingsFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S, R, B, L> SettingsFactory<S, R, B, L>
where
    S: AppSettingsSearch,
    R: ConfigurationRootFactory,
    B: SectionBinder,
    L: PathLocator,
{
    pub fn from_parts(search: S, roots: R, binder: B, locator: L) -> Self {
        Self {
            search,
            roots,
            binder,
            locator,
        }
    }

    /// Replaces the locator consulted for empty base paths.
    pub fn with_locator<L2: PathLocator>(self, locator: L2) -> SettingsFactory<S, R, B, L2> {
        SettingsFactory {
            search: self.search,
            roots: self.roots,
            binder: self.binder,
            locator,
        }
    }

    /// Loads the section `config.section_key()` as `T`.
    ///
    /// Fails with [`Error::AppSettingsNotFound`] carrying `config.base_path()`
    /// when no settings file is found. Parse and binding failures come back
    /// unchanged inside [`Error::Config`].
    pub fn create_settings<T>(&self, config: &SettingsConfiguration) -> Result<T, Error>
    where
        T: DeserializeOwned + Default,
    {
        let base_path = self.search_base(config.base_path());
        let search = self.search.search_app_settings(&base_path);
        let Some(settings_path) = search.path() else {
            return Err(Error::AppSettingsNotFound(config.base_path().to_path_buf()));
        };

        let root = self.roots.create(settings_path, config.overlay_name())?;
        let settings = self.binder.bind(&root, config.section_key())?;
        Ok(settings)
    }

    fn search_base(&self, base_path: &Path) -> PathBuf {
        if !base_path.as_os_str().is_empty() {
            return base_path.to_path_buf();
        }

        let located = self.locator.locate().unwrap_or_default();
        debug!(base = %located.display(), "no base path given, using located path");
        located
    }
}
