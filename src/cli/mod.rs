//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing and subcommand handlers.

mod args;
mod commands;
mod error;

pub use args::{Args, Command};
pub use commands::{handle_config_action, list_cameras, run_scan};
pub use error::CliError;
