//! Test fixtures for common test scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::workspace::WorkspaceSettings;
use crate::util::shell::Shell;

/// Builder for a directory tree on disk.
#[derive(Debug, Clone)]
pub struct TreeFixture {
    root: PathBuf,
    files: Vec<(PathBuf, String)>,
    dirs: Vec<PathBuf>,
}

impl TreeFixture {
    /// Start a tree rooted at `root` (created on build).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TreeFixture {
            root: root.into(),
            files: Vec::new(),
            dirs: Vec::new(),
        }
    }

    /// Add a file; parent directories are created as needed.
    pub fn file(mut self, rel: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.files.push((rel.as_ref().to_path_buf(), content.into()));
        self
    }

    /// Add an empty directory.
    pub fn dir(mut self, rel: impl AsRef<Path>) -> Self {
        self.dirs.push(rel.as_ref().to_path_buf());
        self
    }

    /// Write the tree and return its root.
    pub fn build(self) -> PathBuf {
        fs::create_dir_all(&self.root).unwrap();
        for dir in &self.dirs {
            fs::create_dir_all(self.root.join(dir)).unwrap();
        }
        for (rel, content) in &self.files {
            let path = self.root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        self.root
    }
}

/// Workspace settings rooted at `temp_root` with no reference path.
pub fn test_settings(temp_root: &Path) -> WorkspaceSettings {
    WorkspaceSettings::new(temp_root.to_path_buf())
}

/// A shell that records messages instead of printing them.
pub fn capture_shell() -> Arc<Shell> {
    Arc::new(Shell::captured())
}

/// Entries directly under `dir`, sorted.
pub fn children(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map(|rd| rd.filter_map(Result::ok).map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}
