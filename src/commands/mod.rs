//! CLI command implementations for prlmk.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: System validation
//! - `config`: Configuration file generation
//! - `snapshot`: Read-only view of the pressure state and candidates

pub mod check;
pub mod config;
pub mod snapshot;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use snapshot::command_snapshot;
