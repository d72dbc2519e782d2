//! Test utilities for keg unit tests.
//!
//! Provides fault-injecting filesystem operations for exercising the
//! best-effort cleanup paths, plus fixtures for building directory trees and
//! workspace settings under a throwaway root.
//!
//! # Example
//!
//! ```rust,ignore
//! use keg::test_support::{FailingFs, TreeFixture};
//!
//! #[test]
//! fn test_example() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     let root = TreeFixture::new(tmp.path().join("root")).file("a.txt", "a").build();
//!     let ops = FailingFs::new().fail_remove(root.join("a.txt"));
//!     let report = keg::util::fs::remove_tree(&ops, &root);
//!     assert_eq!(report.skipped.len(), 2);
//! }
//! ```

pub mod fixtures;

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::util::fs::{RealFs, TreeOps};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Real filesystem operations that fail with `PermissionDenied` on chosen
/// paths.
#[derive(Debug, Default)]
pub struct FailingFs {
    fail_remove: HashSet<PathBuf>,
    fail_remove_named: HashSet<OsString>,
    fail_read_dir: HashSet<PathBuf>,
    /// Every path a remove was attempted on, in order
    attempts: Mutex<Vec<PathBuf>>,
}

impl FailingFs {
    pub fn new() -> Self {
        FailingFs::default()
    }

    /// Make `remove_file`/`remove_dir` fail for `path`.
    pub fn fail_remove(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_remove.insert(path.into());
        self
    }

    /// Make removal fail for any node with this file name.
    ///
    /// Useful when the parent directory is only known at run time.
    pub fn fail_remove_named(mut self, name: impl Into<OsString>) -> Self {
        self.fail_remove_named.insert(name.into());
        self
    }

    /// Make `read_dir` fail for `path`.
    pub fn fail_read_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_read_dir.insert(path.into());
        self
    }

    /// Paths a removal was attempted on.
    pub fn attempts(&self) -> Vec<PathBuf> {
        self.attempts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    fn check(&self, set: &HashSet<PathBuf>, path: &Path) -> io::Result<()> {
        if set.contains(path) {
            Err(injected(path))
        } else {
            Ok(())
        }
    }

    fn check_remove(&self, path: &Path) -> io::Result<()> {
        self.check(&self.fail_remove, path)?;
        match path.file_name() {
            Some(name) if self.fail_remove_named.contains(name) => Err(injected(path)),
            _ => Ok(()),
        }
    }

    fn note_attempt(&self, path: &Path) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(path.to_path_buf());
        }
    }
}

fn injected(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("injected failure: {}", path.display()),
    )
}

impl TreeOps for FailingFs {
    fn symlink_metadata(&self, path: &Path) -> io::Result<fs::Metadata> {
        RealFs.symlink_metadata(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.check(&self.fail_read_dir, path)?;
        RealFs.read_dir(path)
    }

    fn set_permissions(&self, path: &Path, perm: fs::Permissions) -> io::Result<()> {
        RealFs.set_permissions(path, perm)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.note_attempt(path);
        self.check_remove(path)?;
        RealFs.remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.note_attempt(path);
        self.check_remove(path)?;
        RealFs.remove_dir(path)
    }
}

/// Assertion helpers for testing.
pub mod assertions {
    use super::*;

    /// Assert that an error message contains a substring.
    pub fn assert_error_contains<T: std::fmt::Debug, E: std::fmt::Display>(
        result: Result<T, E>,
        substring: &str,
    ) {
        match result {
            Ok(v) => panic!("expected Err containing '{}', got Ok: {:?}", substring, v),
            Err(e) => {
                let msg = e.to_string();
                assert!(
                    msg.contains(substring),
                    "error '{}' does not contain '{}'",
                    msg,
                    substring
                );
            }
        }
    }

    /// Assert that a directory exists and is empty.
    pub fn assert_empty_dir(path: &Path) {
        let entries: Vec<_> = fs::read_dir(path)
            .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
            .filter_map(Result::ok)
            .map(|e| e.path())
            .collect();
        assert!(
            entries.is_empty(),
            "expected {} to be empty, found {:?}",
            path.display(),
            entries
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_failing_fs_injects_only_chosen_paths() {
        let tmp = TempDir::new().unwrap();
        let root = TreeFixture::new(tmp.path().join("root"))
            .file("bad.txt", "x")
            .file("good.txt", "y")
            .build();
        let ops = FailingFs::new().fail_remove(root.join("bad.txt"));

        let err = ops.remove_file(&root.join("bad.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        ops.remove_file(&root.join("good.txt")).unwrap();

        assert_eq!(ops.attempts(), vec![root.join("bad.txt"), root.join("good.txt")]);
    }

    #[test]
    fn test_failing_fs_by_name() {
        let tmp = TempDir::new().unwrap();
        let root = TreeFixture::new(tmp.path().join("root"))
            .file("deep/er/stuck", "x")
            .build();
        let ops = FailingFs::new().fail_remove_named("stuck");

        assert!(ops.remove_file(&root.join("deep/er/stuck")).is_err());
        assert!(root.join("deep/er/stuck").exists());
    }

    #[test]
    fn test_assertions() {
        use assertions::*;

        let tmp = TempDir::new().unwrap();
        assert_empty_dir(tmp.path());

        let err: Result<(), String> = Err("boom happened".to_string());
        assert_error_contains(err, "boom");
    }
}
