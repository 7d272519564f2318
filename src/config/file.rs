//! File-based configuration source.

use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::debug;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Document format of a settings file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    /// `.toml` files are TOML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }
}

/// A configuration source that loads a JSON or TOML settings file.
///
/// Files can be marked as required or optional. Required files that don't exist
/// cause an error; optional files that don't exist are silently skipped.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
    format: FileFormat,
}

impl FileSource {
    /// Creates a new file source, detecting the format from the extension.
    ///
    /// If `required` is true, the build will fail if the file doesn't exist.
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = FileFormat::from_path(&path);
        Self {
            path,
            required,
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        match load_settings_file(&self.path, self.required, self.format)? {
            Some(table) => Ok(vec![ConfigEntry::root(table)]),
            None => Ok(vec![]),
        }
    }
}

/// Loads and parses a settings file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_settings_file(
    path: &Path,
    required: bool,
    format: FileFormat,
) -> Result<Option<Table>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            debug!(path = %path.display(), "optional settings file not found, skipping");
            return Ok(None);
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let parse_error = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    };

    let table = match format {
        FileFormat::Toml => toml::from_str::<Table>(&contents).map_err(|e| parse_error(e.into()))?,
        FileFormat::Json => {
            let document: serde_json::Value =
                serde_json::from_str(&contents).map_err(|e| parse_error(e.into()))?;
            match document {
                serde_json::Value::Object(object) => json_object_to_table(object),
                _ => return Err(parse_error("document root must be an object".into())),
            }
        }
    };

    Ok(Some(table))
}

fn json_object_to_table(object: serde_json::Map<String, serde_json::Value>) -> Table {
    object
        .into_iter()
        .filter_map(|(key, value)| json_to_toml(value).map(|value| (key, value)))
        .collect()
}

/// Converts a JSON value into the tree representation. `null` has no
/// counterpart and is dropped.
fn json_to_toml(value: serde_json::Value) -> Option<Value> {
    use serde_json::Value as Json;

    match value {
        Json::Null => None,
        Json::Bool(b) => Some(Value::Boolean(b)),
        Json::Number(n) => Some(match n.as_i64() {
            Some(i) => Value::Integer(i),
            // u64 beyond i64::MAX keeps its digits as a string so the binder
            // can still parse it into a u64 field.
            None if n.is_u64() => Value::String(n.to_string()),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Json::String(s) => Some(Value::String(s)),
        Json::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(json_to_toml).collect(),
        )),
        Json::Object(object) => Some(Value::Table(json_object_to_table(object))),
    }
}
