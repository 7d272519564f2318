use toml::{Table, Value};

use super::ConfigError;

/// A value contributed by a source, anchored at `path` below the root.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub path: Vec<String>,
    pub value: Value,
}

impl ConfigEntry {
    pub fn root(table: Table) -> Self {
        Self {
            path: Vec::new(),
            value: Value::Table(table),
        }
    }

    pub fn at_path(path: Vec<String>, value: Value) -> Self {
        Self { path, value }
    }
}

/// One layer of a configuration root.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Human-readable name used in logs and in [`ConfigurationRoot::sources`].
    ///
    /// [`ConfigurationRoot::sources`]: super::ConfigurationRoot::sources
    fn name(&self) -> String;

    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError>;
}

/// Finds the key in `table` equal to `key` ignoring ASCII case.
pub(crate) fn find_key<'a>(table: &'a Table, key: &str) -> Option<&'a String> {
    table.keys().find(|k| k.eq_ignore_ascii_case(key))
}

pub fn merge_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        if let Value::Table(overlay) = value {
            deep_merge(table, overlay);
        }
        return;
    };

    let key = find_key(table, first).cloned().unwrap_or_else(|| first.clone());

    if rest.is_empty() {
        match (table.get_mut(&key), value) {
            (Some(Value::Table(base)), Value::Table(overlay)) => {
                deep_merge(base, overlay);
            }
            (_, value) => {
                table.insert(key, value);
            }
        }
        return;
    }

    match table.get_mut(&key) {
        Some(Value::Table(_)) => {}
        // Indexing into an array keeps its other elements; the binder reads
        // the index-keyed table back as a sequence.
        Some(Value::Array(items)) if rest[0].parse::<usize>().is_ok() => {
            let indexed = std::mem::take(items)
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect();
            table.insert(key.clone(), Value::Table(indexed));
        }
        _ => {
            table.insert(key.clone(), Value::Table(Table::new()));
        }
    }

    if let Some(Value::Table(nested)) = table.get_mut(&key) {
        merge_at_path(nested, rest, value);
    }
}

/// Merges `overlay` into `base`. Nested tables merge recursively, anything
/// else replaces. Keys keep the spelling already present in `base`.
pub fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        let key = find_key(base, &key).cloned().unwrap_or(key);
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
