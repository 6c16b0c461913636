//! Tibrah command-line player
//!
//! Library half of the `tibrah` binary: argument definitions, configuration
//! loading and the subcommand implementations.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands, PlaybackArgs, ReminderCommands};
pub use config::TibrahConfig;
pub use error::{CliError, Result};
