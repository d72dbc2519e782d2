//! Scoped temporary workspaces.
//!
//! A [`ScopedWorkspace`] creates one directory under the configured temp root,
//! hands it to a callback, and removes it again afterwards unless the callback
//! asked for it to be retained:
//!
//! ```text
//! Inert --run--> Active --callback done--> Cleaned
//!                                     \--> Retained (retain() was called)
//! ```
//!
//! `run` consumes the workspace, so each one is used exactly once. Teardown
//! uses [`remove_tree`], which never fails, and holds termination signals
//! back until it is done.

use std::cell::Cell;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::util::fs::{remove_tree, RealFs, RemovalReport, TreeOps};
use crate::util::ownership;
use crate::util::shell::{Shell, Status};
use crate::util::signal::ignore_interrupts;

/// Serializes workspaces across threads; the working directory is process-wide.
static ACTIVE: Mutex<()> = Mutex::new(());

thread_local! {
    static RUNNING_HERE: Cell<bool> = const { Cell::new(false) };
}

/// Errors that abort a workspace run before the callback starts.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create temporary directory in {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to set group ownership on {path}")]
    Ownership {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to change directory to {path}")]
    Chdir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("a scoped workspace is already active on this thread")]
    Nested,
}

/// Where workspaces are created and which group they get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    /// Directory under which every workspace is created
    pub temp_root: PathBuf,

    /// Path whose group new workspaces should share
    pub reference_path: Option<PathBuf>,

    /// Group used when the reference group is not available
    pub fallback_gid: Option<u32>,
}

impl WorkspaceSettings {
    pub fn new(temp_root: PathBuf) -> Self {
        WorkspaceSettings {
            temp_root,
            reference_path: None,
            fallback_gid: None,
        }
    }

    pub fn with_reference_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_path = Some(path.into());
        self
    }

    pub fn with_fallback_gid(mut self, gid: u32) -> Self {
        self.fallback_gid = Some(gid);
        self
    }
}

/// Per-run options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceOptions {
    /// Keep the directory after the callback returns
    pub retain: bool,

    /// Make the workspace the current directory during the callback
    pub chdir: bool,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        WorkspaceOptions {
            retain: false,
            chdir: true,
        }
    }
}

/// One ephemeral working directory.
pub struct ScopedWorkspace {
    prefix: String,
    settings: WorkspaceSettings,
    shell: Arc<Shell>,
    ops: Arc<dyn TreeOps>,
    chdir: bool,
    tmpdir: Option<PathBuf>,
    retain: bool,
    quiet: bool,
}

impl ScopedWorkspace {
    /// Create an inert workspace; nothing touches the disk until [`run`].
    ///
    /// [`run`]: ScopedWorkspace::run
    pub fn new(prefix: impl Into<String>, settings: WorkspaceSettings, shell: Arc<Shell>) -> Self {
        ScopedWorkspace::with_options(prefix, settings, shell, WorkspaceOptions::default())
    }

    pub fn with_options(
        prefix: impl Into<String>,
        settings: WorkspaceSettings,
        shell: Arc<Shell>,
        options: WorkspaceOptions,
    ) -> Self {
        ScopedWorkspace {
            prefix: prefix.into(),
            settings,
            shell,
            ops: Arc::new(RealFs),
            chdir: options.chdir,
            tmpdir: None,
            retain: options.retain,
            quiet: false,
        }
    }

    /// Use different filesystem operations for teardown.
    pub fn with_tree_ops(mut self, ops: Arc<dyn TreeOps>) -> Self {
        self.ops = ops;
        self
    }

    /// Keep the directory on disk after the run.
    pub fn retain(&mut self) {
        self.retain = true;
    }

    /// Do not announce a retained directory.
    pub fn quiet(&mut self) {
        self.quiet = true;
    }

    pub fn is_retained(&self) -> bool {
        self.retain
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The workspace directory; `None` until `run` has created it.
    pub fn tmpdir(&self) -> Option<&Path> {
        self.tmpdir.as_deref()
    }

    /// Create the directory, run `f` inside it, then clean up.
    ///
    /// The callback's result is returned unchanged. Cleanup happens on every
    /// exit path, including a panic in `f`, which resumes once the directory
    /// is gone.
    pub fn run<T, E, F>(mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut ScopedWorkspace) -> Result<T, E>,
        E: From<WorkspaceError>,
    {
        if RUNNING_HERE.with(Cell::get) {
            return Err(WorkspaceError::Nested.into());
        }
        let _active = ACTIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        RUNNING_HERE.with(|r| r.set(true));
        let _running = RunningFlag;

        let dir = self.create()?;
        tracing::debug!("created workspace {}", dir.display());

        let outcome = {
            let cwd = if self.chdir {
                match CwdGuard::enter(&dir) {
                    Ok(guard) => Some(guard),
                    Err(e) => {
                        remove_tree(self.ops.as_ref(), &dir);
                        return Err(e.into());
                    }
                }
            } else {
                None
            };
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut self)));
            drop(cwd);
            outcome
        };

        self.finish(&dir);

        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn create(&mut self) -> Result<PathBuf, WorkspaceError> {
        let root = &self.settings.temp_root;
        std::fs::create_dir_all(root).map_err(|source| WorkspaceError::Create {
            path: root.clone(),
            source,
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", sanitize_prefix(&self.prefix)))
            .tempdir_in(root)
            .map_err(|source| WorkspaceError::Create {
                path: root.clone(),
                source,
            })?
            .keep();
        self.tmpdir = Some(dir.clone());

        if let Err(e) = self.assign_group(&dir) {
            remove_tree(self.ops.as_ref(), &dir);
            return Err(e);
        }

        Ok(dir)
    }

    fn assign_group(&self, dir: &Path) -> Result<(), WorkspaceError> {
        let gid = ownership::preferred_gid(
            self.settings.reference_path.as_deref(),
            self.settings.fallback_gid,
        );

        match ownership::set_group(dir, gid) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                let msg = format!(
                    "Failed setting group \"{}\" on {}",
                    ownership::group_label(gid),
                    dir.display()
                );
                tracing::warn!("{}", msg);
                self.shell.warn(msg);
                Ok(())
            }
            Err(source) => Err(WorkspaceError::Ownership {
                path: dir.to_path_buf(),
                source,
            }),
        }
    }

    fn finish(&self, dir: &Path) {
        if self.retain {
            if !self.quiet {
                self.shell.status(
                    Status::Retained,
                    format!("temporary files at {}", dir.display()),
                );
            }
            return;
        }

        let report = self.cleanup(dir);
        tracing::debug!(
            "removed workspace {} ({} nodes, {} skipped)",
            dir.display(),
            report.removed,
            report.skipped.len()
        );
    }

    fn cleanup(&self, dir: &Path) -> RemovalReport {
        ignore_interrupts(|| remove_tree(self.ops.as_ref(), dir))
    }
}

impl fmt::Display for ScopedWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = self
            .tmpdir
            .as_deref()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        write!(
            f,
            "[ScopedWorkspace: {} retain={} quiet={}]",
            dir, self.retain, self.quiet
        )
    }
}

impl fmt::Debug for ScopedWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedWorkspace")
            .field("prefix", &self.prefix)
            .field("settings", &self.settings)
            .field("chdir", &self.chdir)
            .field("tmpdir", &self.tmpdir)
            .field("retain", &self.retain)
            .field("quiet", &self.quiet)
            .finish()
    }
}

/// Make a label safe to use in a directory name.
///
/// `@` becomes `A`; path separators and NUL become `_`.
pub fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .chars()
        .map(|c| match c {
            '@' => 'A',
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}

/// Clears the per-thread "workspace running" flag on every exit path.
struct RunningFlag;

impl Drop for RunningFlag {
    fn drop(&mut self) {
        RUNNING_HERE.with(|r| r.set(false));
    }
}

/// Changes the current directory and restores the previous one on drop.
struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    fn enter(dir: &Path) -> Result<Self, WorkspaceError> {
        let previous = std::env::current_dir().map_err(|source| WorkspaceError::Chdir {
            path: dir.to_path_buf(),
            source,
        })?;
        std::env::set_current_dir(dir).map_err(|source| WorkspaceError::Chdir {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(CwdGuard { previous })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            tracing::warn!(
                "failed to restore working directory {}: {}",
                self.previous.display(),
                e
            );
        }
    }
}
