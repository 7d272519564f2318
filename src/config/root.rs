use toml::{Table, Value};

use super::source::find_key;

/// The merged, read-only configuration tree built from one or more sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationRoot {
    table: Table,
    sources: Vec<String>,
}

impl ConfigurationRoot {
    pub(crate) fn new(table: Table, sources: Vec<String>) -> Self {
        Self { table, sources }
    }

    /// Names of the sources that contributed to this root, lowest precedence first.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn as_table(&self) -> &Table {
        &self.table
    }

    /// Looks up a value by hierarchical key.
    ///
    /// Segments are separated by `:` or `.` and matched ignoring ASCII case.
    /// An empty key addresses nothing.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut segments = split_key(key);
        let first = segments.next()?;
        let mut current = self.table.get(find_key(&self.table, first)?)?;

        for segment in segments {
            let table = current.as_table()?;
            current = table.get(find_key(table, segment)?)?;
        }

        Some(current)
    }

    /// Returns the subtree at `key`, or `None` when it doesn't exist or is
    /// not a table.
    pub fn section(&self, key: &str) -> Option<&Table> {
        self.get(key).and_then(Value::as_table)
    }
}

fn split_key(key: &str) -> impl Iterator<Item = &str> {
    key.split([':', '.']).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ConfigurationRoot {
        let table = toml::from_str(
            r#"
            [Logging.LogLevel]
            Default = "Information"

            [Database]
            Port = 5432
            "#,
        )
        .unwrap();
        ConfigurationRoot::new(table, vec!["test".into()])
    }

    #[test]
    fn test_get_accepts_both_separators() {
        let root = root();

        assert_eq!(
            root.get("Logging:LogLevel:Default").and_then(Value::as_str),
            Some("Information")
        );
        assert_eq!(
            root.get("Logging.LogLevel.Default").and_then(Value::as_str),
            Some("Information")
        );
    }

    #[test]
    fn test_get_ignores_case() {
        assert_eq!(root().get("database:port").and_then(Value::as_integer), Some(5432));
    }

    #[test]
    fn test_section_missing_or_scalar() {
        let root = root();

        assert!(root.section("Missing").is_none());
        assert!(root.section("Database:Port").is_none());
        assert!(root.section("").is_none());
        assert!(root.section("Database").is_some());
    }
}
