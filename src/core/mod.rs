//! Core data structures for keg.
//!
//! This module contains the pieces the build orchestrator uses:
//! - Build options and their resolution (`with`/`without` queries)
//! - Dependencies as capability descriptors
//! - Scoped temporary workspaces

pub mod build_options;
pub mod dependency;
pub mod options;
pub mod workspace;

pub use build_options::BuildOptions;
pub use dependency::{Capability, Dependency, DependencyTag};
pub use options::{BuildOption, Options, BUILD_BOTTLE, HEAD};
pub use workspace::{
    sanitize_prefix, ScopedWorkspace, WorkspaceError, WorkspaceOptions, WorkspaceSettings,
};
