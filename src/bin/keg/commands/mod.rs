//! Command implementations

pub mod completions;
pub mod options;
pub mod stage;
