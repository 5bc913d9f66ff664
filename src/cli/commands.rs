//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::manifest::ManifestFormat;

/// Stratosphere - declarative Deployment Manager client.
#[derive(Parser, Debug)]
#[command(name = "stratosphere")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Provisioning project id.
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Environment name, used as the deployment name prefix.
    #[arg(long = "env", global = true)]
    pub environment: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Manifest format.
    #[arg(long, global = true, value_enum)]
    pub format: Option<ManifestFormat>,

    /// Path to the settings file.
    #[arg(short, long, global = true, env = "STRATOSPHERE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a catalog to manifest text on stdout.
    Render {
        /// Catalog file (YAML or JSON).
        catalog: PathBuf,

        /// Print a resource table to stderr.
        #[arg(short, long)]
        summary: bool,
    },

    /// Create or update the catalog's deployment.
    Apply {
        /// Catalog file (YAML or JSON).
        catalog: PathBuf,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Seconds between operation polls.
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Give up waiting for the operation after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Delete the catalog's deployment.
    Delete {
        /// Catalog file (YAML or JSON).
        catalog: PathBuf,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Seconds between operation polls.
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Give up waiting for the operation after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
}
