//! CLI module for the Stratosphere provisioning client.
//!
//! This module provides the command-line interface: arguments, the
//! confirmation prompt and output formatting.

mod commands;
mod output;
mod prompt;

pub use commands::{Cli, Commands};
pub use output::OutputFormatter;
pub use prompt::{DEFAULT_COUNTDOWN_SECS, StdinConfirmer};
