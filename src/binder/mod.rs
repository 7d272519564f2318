//! Binding configuration sections onto typed values.

mod de;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{ConfigError, ConfigurationRoot};

pub use de::{from_value, BindError};

/// Materializes a typed value from a section of a [`ConfigurationRoot`].
pub trait SectionBinder {
    /// Binds the subtree at `section_key` onto `T`.
    ///
    /// A section that doesn't exist yields `T::default()`.
    fn bind<T>(&self, root: &ConfigurationRoot, section_key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default;
}

/// The default [`SectionBinder`], backed by [`bind_section`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionConfigurator;

impl SectionBinder for SectionConfigurator {
    fn bind<T>(&self, root: &ConfigurationRoot, section_key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        bind_section(root, section_key)
    }
}

/// Binds the section at `section_key` onto `T`.
///
/// Keys are hierarchical (`Logging:LogLevel` or `Logging.LogLevel`) and
/// case-insensitive. A missing section is not an error: it binds to
/// `T::default()`.
///
/// ```
/// use serde::Deserialize;
/// use settings_provisioning::binder::bind_section;
/// use settings_provisioning::config::ConfigurationRoot;
///
/// #[derive(Debug, Default, Deserialize)]
/// struct Smtp {
///     host: String,
///     port: u16,
/// }
///
/// let root = ConfigurationRoot::default();
/// let smtp: Smtp = bind_section(&root, "Smtp")?;
/// assert_eq!(smtp.port, 0);
/// # Ok::<(), settings_provisioning::config::ConfigError>(())
/// ```
pub fn bind_section<T>(root: &ConfigurationRoot, section_key: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let Some(value) = root.get(section_key) else {
        debug!(section = section_key, "section not present, binding defaults");
        return Ok(T::default());
    };

    debug!(section = section_key, "binding section");
    from_value(value, section_key).map_err(|e| ConfigError::BindingError {
        key: e.key().unwrap_or(section_key).to_owned(),
        message: e.message().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    use crate::config::ConfigurationBuilder;
    use crate::config::EnvSource;
    use tempfile::TempDir;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Database {
        host: String,
        port: u16,
        pooling: bool,
    }

    fn root_with(vars: &[(&str, &str)]) -> ConfigurationRoot {
        let source = EnvSource::new("T", "__").with_vars(vars.iter().copied());
        ConfigurationBuilder::new().with_source(source).build().unwrap()
    }

    #[test]
    fn test_absent_section_binds_default() {
        let root = root_with(&[("T__OTHER__X", "1")]);

        let db: Database = SectionConfigurator.bind(&root, "Database").unwrap();

        assert_eq!(db, Database::default());
    }

    #[test]
    fn test_present_section_binds_values() {
        let root = root_with(&[
            ("T__DATABASE__HOST", "db.internal"),
            ("T__DATABASE__PORT", "5432"),
            ("T__DATABASE__POOLING", "true"),
        ]);

        let db: Database = SectionConfigurator.bind(&root, "Database").unwrap();

        assert_eq!(
            db,
            Database {
                host: "db.internal".into(),
                port: 5432,
                pooling: true,
            }
        );
    }

    #[test]
    fn test_nested_section_key() {
        let root = root_with(&[("T__SERVICES__PRIMARY__DATABASE__PORT", "1")]);

        let db: Database = bind_section(&root, "Services:Primary:Database").unwrap();

        assert_eq!(db.port, 1);
    }

    #[test]
    fn test_binding_error_identifies_key() {
        let root = root_with(&[("T__DATABASE__PORT", "not-a-port")]);

        let err = bind_section::<Database>(&root, "Database").unwrap_err();

        match err {
            ConfigError::BindingError { key, .. } => assert_eq!(key, "Database.port"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scalar_section_binds_scalar() {
        let root = root_with(&[("T__RETRIES", "3")]);

        let retries: u32 = bind_section(&root, "Retries").unwrap();

        assert_eq!(retries, 3);
    }

    #[test]
    fn test_env_override_of_one_array_element_keeps_the_rest() {
        #[derive(Debug, Default, Deserialize)]
        #[serde(default)]
        struct Pool {
            servers: Vec<String>,
        }

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("appsettings.json");
        std::fs::write(&file, r#"{ "Pool": { "Servers": ["a", "b", "c"] } }"#).unwrap();
        let env = EnvSource::new("APP", "__").with_vars([("APP__POOL__SERVERS__0", "x")]);

        let root = ConfigurationBuilder::new()
            .with_file(&file, true)
            .with_source(env)
            .build()
            .unwrap();
        let pool: Pool = bind_section(&root, "Pool").unwrap();

        assert_eq!(pool.servers, vec!["x", "b", "c"]);
    }

    #[test]
    fn test_nested_env_key_wins_over_scalar_regardless_of_order() {
        #[derive(Debug, Default, Deserialize)]
        #[serde(default)]
        struct Smtp {
            host: String,
        }

        let root = root_with(&[("T__SMTP__HOST", "mail"), ("T__SMTP", "off")]);

        let smtp: Smtp = bind_section(&root, "Smtp").unwrap();

        assert_eq!(smtp.host, "mail");
    }
}
