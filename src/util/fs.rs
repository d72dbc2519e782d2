//! Filesystem utilities.
//!
//! The interesting part is [`remove_tree`], the best-effort recursive delete
//! used to tear down scoped workspaces. It walks the tree with an explicit
//! worklist and records every node it could not remove instead of failing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Filesystem operations used by [`remove_tree`].
///
/// [`RealFs`] forwards to `std::fs`. Tests substitute implementations that
/// fail on chosen paths.
pub trait TreeOps: Send + Sync {
    /// Metadata of the node itself, not following symlinks.
    fn symlink_metadata(&self, path: &Path) -> io::Result<fs::Metadata>;

    /// Paths of the direct children of a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn set_permissions(&self, path: &Path, perm: fs::Permissions) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl TreeOps for RealFs {
    fn symlink_metadata(&self, path: &Path) -> io::Result<fs::Metadata> {
        fs::symlink_metadata(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn set_permissions(&self, path: &Path, perm: fs::Permissions) -> io::Result<()> {
        fs::set_permissions(path, perm)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}

/// A node [`remove_tree`] left behind.
#[derive(Debug)]
pub struct SkippedNode {
    pub path: PathBuf,
    pub error: io::Error,
}

/// Outcome of a [`remove_tree`] call.
#[derive(Debug, Default)]
pub struct RemovalReport {
    /// Number of files, symlinks and directories removed
    pub removed: usize,

    /// Nodes that could not be removed, with the first error seen for each
    pub skipped: Vec<SkippedNode>,
}

impl RemovalReport {
    /// True if nothing was left behind.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    fn record(&mut self, path: &Path, result: io::Result<()>) {
        match result {
            Ok(()) => self.removed += 1,
            // Already gone
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(error) => self.skip(path, error),
        }
    }

    fn skip(&mut self, path: &Path, error: io::Error) {
        tracing::debug!("skipping {}: {}", path.display(), error);
        self.skipped.push(SkippedNode {
            path: path.to_path_buf(),
            error,
        });
    }
}

enum Visit {
    Enter(PathBuf),
    Leave(PathBuf),
}

/// Recursively delete `root`, skipping whatever cannot be removed.
///
/// Directories (never followed through symlinks) owned by the current user
/// first get owner `rwx` so their children can be listed and unlinked even if
/// a build step stripped those bits. Files and symlinks are unlinked
/// regardless of their own mode. A failure at one node skips that node (and,
/// for an unreadable directory, its subtree) and the walk carries on with the
/// rest. This function never fails; consult the report for what was left.
pub fn remove_tree(ops: &dyn TreeOps, root: &Path) -> RemovalReport {
    let mut report = RemovalReport::default();
    let mut stack = vec![Visit::Enter(root.to_path_buf())];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(path) => {
                let meta = match ops.symlink_metadata(&path) {
                    Ok(meta) => meta,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        report.skip(&path, e);
                        continue;
                    }
                };

                if !meta.is_dir() {
                    let result = ops.remove_file(&path);
                    report.record(&path, result);
                    continue;
                }

                if is_owned(&meta) {
                    if let Some(perm) = owner_accessible(&meta) {
                        if let Err(e) = ops.set_permissions(&path, perm) {
                            tracing::debug!("chmod u+rwx {} failed: {}", path.display(), e);
                        }
                    }
                }

                match ops.read_dir(&path) {
                    Ok(children) => {
                        stack.push(Visit::Leave(path));
                        stack.extend(children.into_iter().map(Visit::Enter));
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => report.skip(&path, e),
                }
            }
            Visit::Leave(path) => {
                let result = ops.remove_dir(&path);
                report.record(&path, result);
            }
        }
    }

    report
}

#[cfg(unix)]
fn is_owned(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    meta.uid() == nix::unistd::geteuid().as_raw()
}

#[cfg(not(unix))]
fn is_owned(_meta: &fs::Metadata) -> bool {
    false
}

/// Permissions with owner `rwx` added, or `None` if already present.
#[cfg(unix)]
fn owner_accessible(meta: &fs::Metadata) -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode();
    if mode & 0o700 == 0o700 {
        None
    } else {
        Some(fs::Permissions::from_mode(mode | 0o700))
    }
}

#[cfg(not(unix))]
fn owner_accessible(_meta: &fs::Metadata) -> Option<fs::Permissions> {
    None
}

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}
