//! Command-line interface for tailroster.
//!
//! This module provides the CLI structure and output rendering for the
//! `tailroster` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, FetchCommand, LookupCommand, OutputFormat, PoolCommand};

use crate::logging::Verbosity;

/// tailroster - Fetch a roster of aircraft by registration
///
/// Builds a working set of tail numbers, looks them all up concurrently, and
/// shows the ones that resolved.
#[derive(Debug, Parser)]
#[command(name = "tailroster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch an aircraft roster
    Fetch(FetchCommand),

    /// Look up a single registration
    Lookup(LookupCommand),

    /// Print a working set of registrations without fetching
    Pool(PoolCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
