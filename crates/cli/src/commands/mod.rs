//! Subcommand implementations

pub mod history;
pub mod predict;
pub mod status;
