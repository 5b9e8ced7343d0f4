//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Courier - transaction-aware message dispatch
#[derive(Parser, Debug)]
#[command(
    name = "courier",
    author,
    version,
    about = "Transaction-aware message dispatcher",
    long_about = "Delivers saved messages to configured processors.\n\n\
                  Sends made while a transaction is open are buffered and \n\
                  replayed after commit, or discarded on rollback."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "COURIER_VERBOSE")]
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
        env = "COURIER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scenario of transactions and sends
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "courier.toml", env = "COURIER_CONFIG")]
    pub config: PathBuf,

    /// Path to scenario file (TOML or JSON)
    #[arg(short, long, env = "COURIER_SCENARIO")]
    pub scenario: Option<PathBuf>,

    /// Start with site messaging disabled, overriding the configuration
    #[arg(long, env = "COURIER_MESSAGING_DISABLED")]
    pub messaging_disabled: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "COURIER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Validate configuration and scenario and exit without sending
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "courier.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "courier.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show processor parameters
    #[arg(long)]
    pub params: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
