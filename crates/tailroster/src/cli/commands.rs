//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Fetch command arguments.
#[derive(Debug, Args)]
pub struct FetchCommand {
    /// Working set size (defaults to roster.target_size)
    #[arg(short, long)]
    pub target: Option<usize>,

    /// Maximum number of aircraft to show (defaults to roster.cap)
    #[arg(long)]
    pub cap: Option<usize>,

    /// Overall deadline in milliseconds (defaults to roster.deadline_ms)
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Username to sign in with
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password to sign in with
    #[arg(short, long)]
    pub password: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl FetchCommand {
    /// Check if the user supplied any credentials.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }
}

/// Lookup command arguments.
#[derive(Debug, Args)]
pub struct LookupCommand {
    /// Registration to look up (e.g. N271DV)
    pub registration: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Pool command arguments.
#[derive(Debug, Args)]
pub struct PoolCommand {
    /// Working set size (defaults to roster.target_size)
    #[arg(short, long)]
    pub target: Option<usize>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
