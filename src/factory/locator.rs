use std::path::PathBuf;

use directories::BaseDirs;

/// Supplies a base path when the caller didn't give one.
pub trait PathLocator {
    fn locate(&self) -> Option<PathBuf>;
}

/// Starts the search in the process' current directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkingDirectoryLocator;

impl PathLocator for WorkingDirectoryLocator {
    fn locate(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }
}

/// Starts the search in the user's home directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomeDirectoryLocator;

impl PathLocator for HomeDirectoryLocator {
    fn locate(&self) -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
    }
}

/// Always starts the search at the same path.
#[derive(Debug, Clone)]
pub struct FixedPathLocator(pub PathBuf);

impl PathLocator for FixedPathLocator {
    fn locate(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}
