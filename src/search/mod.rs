//! Locating the settings file on disk.
//!
//! The search starts at a base directory and checks each directory for a
//! conventionally named settings file. By default it walks upward through
//! the parents, so the file nearest to the base path wins.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// File names looked for in every directory, in order of preference.
pub const APP_SETTINGS_FILE_NAMES: &[&str] = &["appsettings.json", "appsettings.toml"];

/// Outcome of a settings file search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettingsSearchResult {
    found: bool,
    path: PathBuf,
}

impl AppSettingsSearchResult {
    pub fn found(path: impl Into<PathBuf>) -> Self {
        Self {
            found: true,
            path: path.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            path: PathBuf::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    /// The resolved settings file, if one was found.
    pub fn path(&self) -> Option<&Path> {
        self.found.then_some(self.path.as_path())
    }

    pub fn into_path(self) -> Option<PathBuf> {
        self.found.then_some(self.path)
    }
}

/// Which directories a search visits, starting from the base path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPolicy {
    /// The base directory, then each ancestor up to the filesystem root.
    #[default]
    Upward,
    /// Breadth-first through subdirectories, at most `max_depth` levels below
    /// the base. Shallower directories win; siblings are visited by name.
    Downward { max_depth: usize },
}

/// Something that can find a settings file starting from a base path.
pub trait AppSettingsSearch {
    fn search_app_settings(&self, base_path: &Path) -> AppSettingsSearchResult;
}

/// Filesystem-backed settings search.
#[derive(Debug, Clone)]
pub struct DirectorySearch {
    file_names: Vec<String>,
    policy: SearchPolicy,
}

impl DirectorySearch {
    pub fn new() -> Self {
        Self {
            file_names: APP_SETTINGS_FILE_NAMES.iter().map(|s| s.to_string()).collect(),
            policy: SearchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the file names looked for. Earlier names win within a directory.
    pub fn with_file_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_names = names.into_iter().map(Into::into).collect();
        self
    }

    fn look_in(&self, dir: &Path) -> Option<PathBuf> {
        self.file_names
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

impl Default for DirectorySearch {
    fn default() -> Self {
        Self::new()
    }
}

impl AppSettingsSearch for DirectorySearch {
    fn search_app_settings(&self, base_path: &Path) -> AppSettingsSearchResult {
        let Some(start) = resolve_start(base_path) else {
            debug!(base = %base_path.display(), "search base does not exist");
            return AppSettingsSearchResult::not_found();
        };

        let look_in = |dir: &Path| self.look_in(dir);
        let result = match self.policy {
            SearchPolicy::Upward => search_upward(&start, look_in),
            SearchPolicy::Downward { max_depth } => search_downward(&start, max_depth, look_in),
        };

        match result.path() {
            Some(path) => info!(
                base = %base_path.display(),
                path = %path.display(),
                "found settings file"
            ),
            None => debug!(base = %base_path.display(), "no settings file found"),
        }
        result
    }
}

/// Turns the caller's base path into an existing, absolute directory.
///
/// Empty means the current directory; relative paths are resolved against
/// it. An existing file stands for its parent directory.
fn resolve_start(base_path: &Path) -> Option<PathBuf> {
    let base = if base_path.as_os_str().is_empty() {
        std::env::current_dir().ok()?
    } else {
        base_path.to_path_buf()
    };

    let canonical = base.canonicalize().ok()?;
    if canonical.is_dir() {
        Some(canonical)
    } else {
        canonical.parent().map(Path::to_path_buf)
    }
}

/// Checks `start` and then each of its ancestors, returning the first hit.
pub fn search_upward<F>(start: &Path, mut look_in: F) -> AppSettingsSearchResult
where
    F: FnMut(&Path) -> Option<PathBuf>,
{
    start
        .ancestors()
        .find_map(|dir| look_in(dir))
        .map_or_else(AppSettingsSearchResult::not_found, AppSettingsSearchResult::found)
}

/// Breadth-first search below `start`, at most `max_depth` levels deep.
///
/// Symbolic links are not followed and unreadable directories are skipped.
pub fn search_downward<F>(start: &Path, max_depth: usize, mut look_in: F) -> AppSettingsSearchResult
where
    F: FnMut(&Path) -> Option<PathBuf>,
{
    let mut queue = VecDeque::from([(start.to_path_buf(), 0usize)]);

    while let Some((dir, depth)) = queue.pop_front() {
        if let Some(found) = look_in(&dir) {
            return AppSettingsSearchResult::found(found);
        }
        if depth >= max_depth {
            continue;
        }

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };

        let mut children: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect();
        children.sort();
        queue.extend(children.into_iter().map(|child| (child, depth + 1)));
    }

    AppSettingsSearchResult::not_found()
}
