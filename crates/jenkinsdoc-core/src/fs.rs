//! Filesystem abstraction for go-to-definition.
//!
//! The definition locator only needs two operations: enumerate the source
//! files under a project root and read one of them. Putting them behind a
//! trait lets the locator be tested without touching the disk.
//!
//! ```ignore
//! let mut mock = MockFileSystem::new();
//! mock.add_file("project/vars/lib.groovy", "def helper() {\n}");
//! let locator = DefinitionLocator::new(Arc::new(mock));
//! ```

use crate::error::{DocError, DocResult};
use std::path::{Path, PathBuf};

/// Directory names never descended into while listing project files.
pub const EXCLUDED_DIRS: &[&str] = &[".git", "node_modules", "__pycache__", ".venv", "venv"];

/// Source file access used by the definition locator.
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// Recursively list files under `root` whose extension equals
    /// `extension`, skipping [`EXCLUDED_DIRS`]. The order is deterministic.
    fn list_files(&self, root: &Path, extension: &str) -> Vec<PathBuf>;

    /// Read a file to a string.
    fn read_file(&self, path: &Path) -> DocResult<String>;
}

fn is_excluded_dir(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == extension)
}

/// Filesystem backed by the real disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn list_files(&self, root: &Path, extension: &str) -> Vec<PathBuf> {
        use ignore::WalkBuilder;

        WalkBuilder::new(root)
            .standard_filters(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| {
                // The root itself is always walked, even if it is named e.g. `venv`
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir && is_excluded_dir(entry.file_name()))
            })
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::debug!(%error, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| has_extension(path, extension))
            .collect()
    }

    fn read_file(&self, path: &Path) -> DocResult<String> {
        std::fs::read_to_string(path).map_err(|source| DocError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }
}
