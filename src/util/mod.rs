//! Shared utilities

pub mod config;
pub mod context;
pub mod fs;
pub mod ownership;
pub mod shell;
pub mod signal;

pub use config::Config;
pub use context::GlobalContext;
pub use shell::Shell;
