//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Mergeflow - run declarative merge operators over JSON lines inputs
#[derive(Parser, Debug)]
#[command(
    name = "mergeflow",
    author,
    version,
    about = "Run declarative multi-source merge operators",
    long_about = "Loads a merge operator declaration (TOML or JSON), feeds each declared \n\
                  JSON lines input into it as a source sequence, and prints what reached \n\
                  every output once all subscriptions have finished."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MERGEFLOW_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "MERGEFLOW_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a merge operator over its declared inputs
    Run(RunArgs),

    /// Validate a declaration without running it
    Validate(ValidateArgs),

    /// Display declaration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the operator declaration (TOML or JSON)
    #[arg(short, long, default_value = "merge.toml", env = "MERGEFLOW_CONFIG")]
    pub config: PathBuf,

    /// Timeout in seconds for all subscriptions to finish (0 = no timeout)
    #[arg(long, default_value = "0", env = "MERGEFLOW_TIMEOUT")]
    pub timeout: u64,

    /// Validate the declaration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Print outputs as a single JSON document
    #[arg(long)]
    pub json: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MERGEFLOW_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the declaration to validate
    #[arg(short, long, default_value = "merge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to the declaration
    #[arg(short, long, default_value = "merge.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List the built-in handlers a declaration can reference
    #[arg(long)]
    pub handlers: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
