use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::env::EnvSource;
use super::file::FileSource;
use super::root::ConfigurationRoot;
use super::source::{merge_at_path, ConfigSource};
use super::ConfigError;

/// Builder for a [`ConfigurationRoot`] layered from several sources.
///
/// Sources are merged in registration order, with later sources overriding
/// earlier ones. Nested tables are merged recursively; other values
/// (including arrays) are replaced entirely. Keys match ignoring ASCII case.
///
/// ## Example
///
/// ```no_run
/// use settings_provisioning::config::ConfigurationBuilder;
///
/// // defaults -> environment overlay -> env vars
/// let root = ConfigurationBuilder::new()
///     .with_file("appsettings.json", true)
///     .with_file("appsettings.Production.json", false)
///     .with_env("MYAPP", "__")
///     .build()?;
///
/// let port = root.get("Database:Port");
/// # Ok::<(), settings_provisioning::config::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ConfigurationBuilder {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a JSON or TOML file to be loaded.
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Loads environment variables with the given prefix.
    ///
    /// Variables are mapped to keys by removing the prefix and separator and
    /// splitting the rest on the separator.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Loads and merges every source in registration order.
    pub fn build(self) -> Result<ConfigurationRoot, ConfigError> {
        let mut merged = toml::Table::new();
        let mut names = Vec::with_capacity(self.sources.len());

        for source in self.sources {
            let name = source.name();
            let entries = source.entries()?;
            if entries.is_empty() {
                debug!(source = %name, "source contributed no entries");
                continue;
            }

            debug!(source = %name, count = entries.len(), "merging configuration source");
            for entry in entries {
                merge_at_path(&mut merged, &entry.path, entry.value);
            }
            names.push(name);
        }

        Ok(ConfigurationRoot::new(merged, names))
    }
}

/// Builds the configuration root for a discovered settings file.
pub trait ConfigurationRootFactory {
    /// `primary` must point at an existing settings file; `overlay` selects
    /// an optional environment-specific file layered on top of it.
    fn create(
        &self,
        primary: &Path,
        overlay: Option<&str>,
    ) -> Result<ConfigurationRoot, ConfigError>;
}

/// Layers the primary file, its overlay, and environment variables.
#[derive(Debug, Clone)]
pub struct AppSettingsRootFactory {
    env: Option<EnvSource>,
}

impl AppSettingsRootFactory {
    pub fn new() -> Self {
        Self {
            env: Some(EnvSource::default()),
        }
    }

    /// Reads environment overrides with a custom prefix and separator.
    ///
    /// An empty separator makes [`create`](ConfigurationRootFactory::create)
    /// fail with [`ConfigError::EmptyEnvSeparator`].
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_env_source(EnvSource::new(prefix, separator))
    }

    /// Uses `source` as the environment layer, e.g. one with a fixed set of
    /// variables from [`EnvSource::with_vars`].
    pub fn with_env_source(mut self, source: EnvSource) -> Self {
        self.env = Some(source);
        self
    }

    /// Disables the environment variable layer.
    pub fn without_env(mut self) -> Self {
        self.env = None;
        self
    }
}

impl Default for AppSettingsRootFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationRootFactory for AppSettingsRootFactory {
    fn create(
        &self,
        primary: &Path,
        overlay: Option<&str>,
    ) -> Result<ConfigurationRoot, ConfigError> {
        let mut builder = ConfigurationBuilder::new().with_file(primary, true);

        if let Some(overlay_path) = overlay.and_then(|name| overlay_path(primary, name)) {
            builder = builder.with_file(overlay_path, false);
        }

        if let Some(env) = &self.env {
            builder = builder.with_source(env.clone());
        }

        let root = builder.build()?;
        info!(
            path = %primary.display(),
            sources = root.sources().len(),
            "built configuration root"
        );
        Ok(root)
    }
}

/// Derives the overlay file next to `primary`: `appsettings.json` with
/// overlay `Development` becomes `appsettings.Development.json`.
///
/// Returns `None` for an empty overlay name or a primary without a file stem.
pub fn overlay_path(primary: &Path, overlay: &str) -> Option<PathBuf> {
    let overlay = overlay.trim();
    if overlay.is_empty() {
        return None;
    }

    let stem = primary.file_stem()?.to_string_lossy();
    let file_name = match primary.extension() {
        Some(ext) => format!("{stem}.{overlay}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{overlay}"),
    };

    Some(primary.with_file_name(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn no_env() -> AppSettingsRootFactory {
        AppSettingsRootFactory::new().without_env()
    }

    #[test]
    fn test_overlay_path() {
        assert_eq!(
            overlay_path(Path::new("/srv/app/appsettings.json"), "Development"),
            Some(PathBuf::from("/srv/app/appsettings.Development.json"))
        );
        assert_eq!(
            overlay_path(Path::new("/srv/app/settings"), "Test"),
            Some(PathBuf::from("/srv/app/settings.Test"))
        );
        assert_eq!(overlay_path(Path::new("/srv/app/appsettings.json"), "  "), None);
    }

    #[test]
    fn test_builder_later_sources_override() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "base.json", r#"{ "App": { "Name": "base", "Port": 80 } }"#);
        let local = write(&dir, "local.toml", "[app]\nport = 8080");

        let root = ConfigurationBuilder::new()
            .with_file(&base, true)
            .with_file(&local, true)
            .build()
            .unwrap();

        assert_eq!(root.get("App:Name").and_then(toml::Value::as_str), Some("base"));
        assert_eq!(root.get("App:Port").and_then(toml::Value::as_integer), Some(8080));
        assert_eq!(root.sources().len(), 2);
    }

    #[test]
    fn test_builder_skips_missing_optional_file() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "base.json", r#"{ "A": 1 }"#);

        let root = ConfigurationBuilder::new()
            .with_file(&base, true)
            .with_file(dir.path().join("missing.json"), false)
            .build()
            .unwrap();

        assert_eq!(root.sources(), &[base.display().to_string()]);
    }

    #[test]
    fn test_factory_layers_overlay_on_primary() {
        let dir = TempDir::new().unwrap();
        let primary = write(
            &dir,
            "appsettings.json",
            r#"{ "Db": { "Host": "localhost", "Port": 5432 } }"#,
        );
        write(&dir, "appsettings.Staging.json", r#"{ "Db": { "Host": "staging-db" } }"#);

        let root = no_env().create(&primary, Some("Staging")).unwrap();

        assert_eq!(root.get("Db:Host").and_then(toml::Value::as_str), Some("staging-db"));
        assert_eq!(root.get("Db:Port").and_then(toml::Value::as_integer), Some(5432));
    }

    #[test]
    fn test_factory_without_overlay_ignores_overlay_files() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "appsettings.json", r#"{ "Mode": "primary" }"#);
        write(&dir, "appsettings.Staging.json", r#"{ "Mode": "staging" }"#);

        let root = no_env().create(&primary, None).unwrap();

        assert_eq!(root.get("Mode").and_then(toml::Value::as_str), Some("primary"));
    }

    #[test]
    fn test_factory_missing_overlay_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "appsettings.json", r#"{ "Mode": "primary" }"#);

        let root = no_env().create(&primary, Some("Nope")).unwrap();

        assert_eq!(root.sources().len(), 1);
    }

    #[test]
    fn test_factory_malformed_primary_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "appsettings.json", "{ not json");

        let err = no_env().create(&primary, None).unwrap_err();

        assert!(err.is_parse_error());
    }

    #[test]
    fn test_factory_malformed_overlay_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "appsettings.json", "{}");
        write(&dir, "appsettings.Dev.json", "{ broken");

        let err = no_env().create(&primary, Some("Dev")).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::ParseError { path, .. } if path.ends_with("appsettings.Dev.json")
        ));
    }

    #[test]
    fn test_env_vars_override_files() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "appsettings.json", r#"{ "Db": { "Port": 5432 } }"#);

        let root = ConfigurationBuilder::new()
            .with_file(&base, true)
            .with_source(EnvSource::new("TESTAPP", "__").with_vars([("TESTAPP__DB__PORT", "6000")]))
            .build()
            .unwrap();

        assert_eq!(root.get("Db:Port").and_then(toml::Value::as_str), Some("6000"));
    }

    #[test]
    fn test_factory_default_env_layer_overrides_files() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "appsettings.json", r#"{ "Db": { "Port": 5432 } }"#);
        let env = EnvSource::default().with_vars([
            ("APPSETTINGS__DB__PORT", "6000"),
            ("OTHER__DB__PORT", "1"),
        ]);

        let root = AppSettingsRootFactory::new()
            .with_env_source(env)
            .create(&primary, None)
            .unwrap();

        assert_eq!(root.get("Db:Port").and_then(toml::Value::as_str), Some("6000"));
        assert_eq!(root.sources().len(), 2);
    }

    #[test]
    fn test_factory_custom_env_prefix_reads_process_env() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "appsettings.json", r#"{ "Db": { "Host": "file" } }"#);
        std::env::set_var("SETTINGS_FACTORY_TEST__DB__HOST", "env");

        let root = AppSettingsRootFactory::new()
            .with_env("SETTINGS_FACTORY_TEST", "__")
            .create(&primary, None)
            .unwrap();

        assert_eq!(root.get("Db:Host").and_then(toml::Value::as_str), Some("env"));
    }

    #[test]
    fn test_factory_empty_env_separator_is_an_error() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "appsettings.json", "{}");

        let result = AppSettingsRootFactory::new()
            .with_env("X", "")
            .create(&primary, None);

        assert!(matches!(result, Err(ConfigError::EmptyEnvSeparator { .. })));
    }
}
