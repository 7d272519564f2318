use toml::Value;
use tracing::debug;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Environment variable prefix read by default on top of the settings files.
pub const DEFAULT_ENV_PREFIX: &str = "APPSETTINGS";

/// Separator between the prefix and each path segment.
pub const DEFAULT_ENV_SEPARATOR: &str = "__";

/// Environment variables as a configuration layer.
///
/// `APPSETTINGS__DATABASE__PORT=5432` becomes `database.port = "5432"`.
/// Values stay strings; conversion happens when a section is bound.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
    vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
    /// An empty `separator` is rejected when the entries are read.
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
            vars: None,
        }
    }

    /// Reads from the given variables instead of the process environment.
    pub fn with_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    fn snapshot(&self) -> Vec<(String, String)> {
        if let Some(vars) = &self.vars {
            return vars.clone();
        }

        std::env::vars_os()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    debug!(var = ?key, "skipping environment variable that is not valid UTF-8");
                    None
                }
            })
            .collect()
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR)
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> String {
        format!("env:{}{}*", self.prefix, self.separator)
    }

    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        if self.separator.is_empty() {
            return Err(ConfigError::EmptyEnvSeparator {
                prefix: self.prefix.clone(),
            });
        }

        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut entries = Vec::new();

        for (key, value) in self.snapshot() {
            let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
                continue;
            };

            let path: Vec<String> = path_str
                .split(&self.separator)
                .map(|s| s.to_lowercase())
                .collect();
            if path.iter().any(|segment| segment.is_empty()) {
                debug!(var = %key, "skipping environment variable with empty path segment");
                continue;
            }

            entries.push(ConfigEntry::at_path(path, Value::String(value)));
        }

        // Shallow keys first, so `X__SMTP__HOST` lands on top of `X__SMTP`
        // whatever order the environment lists them in.
        entries.sort_by(|a, b| {
            a.path.len().cmp(&b.path.len()).then_with(|| a.path.cmp(&b.path))
        });

        Ok(entries)
    }
}
