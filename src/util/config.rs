//! Configuration file support for keg.
//!
//! keg supports two configuration file locations:
//! - Global: `~/.keg/config.toml` - User-wide defaults
//! - Project: `.keg/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, field by field.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// keg configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scoped workspace settings
    pub workspace: WorkspaceConfig,
}

/// Where scoped workspaces are created and which group they get.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkspaceConfig {
    /// Root directory for temporary workspaces (e.g., /private/tmp)
    pub temp_dir: Option<PathBuf>,

    /// Path whose group new workspaces should share (e.g., the keg executable)
    pub reference_path: Option<PathBuf>,

    /// Group id used when the reference path's group is unavailable
    pub fallback_gid: Option<u32>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.workspace.temp_dir.is_some() {
            self.workspace.temp_dir = other.workspace.temp_dir;
        }
        if other.workspace.reference_path.is_some() {
            self.workspace.reference_path = other.workspace.reference_path;
        }
        if other.workspace.fallback_gid.is_some() {
            self.workspace.fallback_gid = other.workspace.fallback_gid;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.keg/config.toml)
/// 2. Global config (~/.keg/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global keg config directory (~/.keg).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".keg"))
}

/// Get the project config path (.keg/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".keg").join("config.toml")
}
