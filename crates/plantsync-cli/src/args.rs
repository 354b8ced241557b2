//! Command-line argument definitions for the Plantsync CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the workspace root, configuration file,
//! logging verbosity and the [`Command`] to run.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Plantsync tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Workspace root directory
    #[arg(short, long, default_value = ".")]
    pub root: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations offered by the CLI. Paths are relative to the workspace root.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render a diagram source into a target file and remember the link
    Render {
        /// File containing the diagram text
        source: String,

        /// Output file; its extension selects the format
        target: String,
    },

    /// Watch the workspace and re-render linked targets when sources change
    Watch,

    /// Re-render every linked target once
    Sync,

    /// List recorded markers
    Markers,

    /// Remove the marker of a source file
    Forget {
        /// File whose link should be dropped
        source: String,
    },
}
