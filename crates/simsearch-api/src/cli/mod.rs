//! CLI command definitions for the `simsearch` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod prep;
pub mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Prepare plot embedding tables and run similarity searches over them.
#[derive(Parser)]
#[command(name = "simsearch", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (defaults to ./simsearch.toml when present).
    #[arg(long, global = true, env = "SIMSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to server.port from the config).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to server.host from the config).
        #[arg(long)]
        host: Option<String>,

        /// Emit logs as JSON lines.
        #[arg(long)]
        log_json: bool,
    },

    /// Run the preparation pipeline for a plot file and wait for it.
    Prep {
        /// Plot file: local path or gs://bucket/object.
        #[arg(short, long)]
        file: String,

        /// Year to prepare (repeatable).
        #[arg(short, long = "year", required = true, num_args = 1..)]
        years: Vec<i32>,
    },

    /// Print the canonical table names a prep run would produce.
    Names {
        /// Plot file: local path or gs://bucket/object.
        #[arg(short, long)]
        file: String,

        /// Year (repeatable).
        #[arg(short, long = "year", required = true, num_args = 1..)]
        years: Vec<i32>,
    },

    /// Find the plots most similar to one plot in a prepared table.
    Search {
        /// Canonical table name, e.g. plots_2022_pp.
        #[arg(short, long)]
        table: String,

        /// Plot id to search around.
        #[arg(short, long)]
        plot: i64,

        /// Number of matches to return (1-50).
        #[arg(short, long, default_value = "5")]
        matches: u32,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
