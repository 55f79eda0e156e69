//! Subcommand implementations

pub mod estimate;
pub mod snapshot;
