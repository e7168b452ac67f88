//! CLI parse: clap types for Finch. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Finch CLI - run GraphQL queries against a schema gateway
#[derive(Parser)]
#[command(name = "finch")]
#[command(about = "Cross-context GraphQL gateway for message-passing execution contexts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (for config/ files)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a query against a schema
    Query {
        /// Schema definition language file
        #[arg(long)]
        schema: PathBuf,
        /// JSON file whose top-level keys resolve the query root fields
        #[arg(long)]
        data: Option<PathBuf>,
        /// Query variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
        /// Send the query as a message through an in-process channel
        #[arg(long)]
        via_message: bool,
        /// Query document text
        query: String,
    },
    /// Validate a schema and print its normalized SDL
    Sdl {
        /// Schema definition language file
        #[arg(long)]
        schema: PathBuf,
    },
    /// Print the effective configuration as TOML
    Config,
}
