//! Global context for keg operations.
//!
//! Provides centralized access to configuration, paths, the user-facing
//! shell, and the effective settings for scoped workspaces.
//!
//! Workspace settings resolve in this order (first match wins):
//! 1. Explicit setter (e.g. `--temp-dir`)
//! 2. Environment (`KEG_TEMP`, `KEG_REFERENCE_PATH`)
//! 3. Merged config files
//! 4. Defaults: the system temp dir, the running executable, the real gid

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::workspace::{ScopedWorkspace, WorkspaceOptions, WorkspaceSettings};
use crate::util::config::{self, Config};
use crate::util::shell::Shell;

/// Environment variable overriding the workspace root.
pub const TEMP_ENV: &str = "KEG_TEMP";

/// Environment variable overriding the group reference path.
pub const REFERENCE_PATH_ENV: &str = "KEG_REFERENCE_PATH";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Merged global and project configuration
    config: Config,

    /// User-facing output
    shell: Arc<Shell>,

    /// Workspace root set explicitly by the caller
    temp_dir: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext, loading configuration from disk.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext for a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let global = config::global_config_dir().map(|dir| dir.join("config.toml"));
        let config = config::load_config(global.as_deref(), &config::project_config_path(&cwd));

        GlobalContext {
            cwd,
            config,
            shell: Arc::new(Shell::default()),
            temp_dir: None,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replace the shell.
    pub fn with_shell(mut self, shell: Arc<Shell>) -> Self {
        self.shell = shell;
        self
    }

    /// Override the workspace root.
    pub fn set_temp_dir(&mut self, dir: PathBuf) {
        self.temp_dir = Some(dir);
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Effective workspace settings from the process environment.
    pub fn workspace_settings(&self) -> WorkspaceSettings {
        self.workspace_settings_from(|key| std::env::var_os(key))
    }

    /// Effective workspace settings with a custom environment lookup.
    pub fn workspace_settings_from<F>(&self, env: F) -> WorkspaceSettings
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let ws = &self.config.workspace;
        let from_env = |key: &str| env(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        let temp_root = self
            .temp_dir
            .clone()
            .or_else(|| from_env(TEMP_ENV))
            .or_else(|| ws.temp_dir.clone())
            .unwrap_or_else(std::env::temp_dir);

        let reference_path = from_env(REFERENCE_PATH_ENV)
            .or_else(|| ws.reference_path.clone())
            .or_else(|| std::env::current_exe().ok());

        WorkspaceSettings {
            temp_root,
            reference_path,
            fallback_gid: ws.fallback_gid,
        }
    }

    /// Create an inert scoped workspace with the effective settings.
    pub fn workspace(&self, prefix: impl Into<String>, options: WorkspaceOptions) -> ScopedWorkspace {
        ScopedWorkspace::with_options(
            prefix,
            self.workspace_settings(),
            Arc::clone(&self.shell),
            options,
        )
    }
}
