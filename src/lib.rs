//! keg - build-option resolution and scoped build workspaces
//!
//! This crate provides the two leaf components a package-build orchestrator
//! leans on while planning and running a build: [`BuildOptions`], which
//! decides from declared options and supplied flags whether a capability is
//! enabled, and [`ScopedWorkspace`], which owns one temporary working
//! directory from creation to guaranteed teardown.

pub mod core;
pub mod util;

/// Test utilities for keg unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides fault-injecting filesystem operations and
/// directory-tree fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    build_options::BuildOptions,
    dependency::{Capability, Dependency},
    options::{BuildOption, Options},
    workspace::{ScopedWorkspace, WorkspaceError, WorkspaceOptions, WorkspaceSettings},
};

pub use util::context::GlobalContext;
