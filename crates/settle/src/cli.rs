//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use settle_core::types::RetryStrategy;

/// Settle - poll and retry commands until eventually-consistent state settles
#[derive(Parser, Debug)]
#[command(name = "settle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory containing settle.yaml (default: ~/.settle)
    #[arg(long, global = true, env = "SETTLE_CONFIG_DIR")]
    pub config_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command until its output matches an expected value
    Check(CheckArgs),

    /// Re-run a command until it exits successfully
    Retry(RetryArgs),

    /// Runtime configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

// Check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Accepted value; repeat to accept any of several
    #[arg(short, long = "expect", required = true, value_name = "VALUE")]
    pub expect: Vec<String>,

    /// Scan output lines from last to first
    #[arg(long)]
    pub reverse: bool,

    /// Wait until no value matches instead
    #[arg(long)]
    pub negate: bool,

    /// Treat each non-empty output line as a separate value
    #[arg(long)]
    pub lines: bool,

    /// Maximum number of runs (default: from config)
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Delay between runs in milliseconds (default: from config)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Command to run on each attempt
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

// Retry command
#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Exit code worth retrying; repeat for several. Any non-zero code when omitted.
    #[arg(long = "transient-exit-code", value_name = "CODE")]
    pub transient_exit_codes: Vec<i32>,

    /// Named retry policy from the config
    #[arg(long, default_value = "default")]
    pub operation: String,

    /// Maximum number of runs
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Delay strategy (none, fixed-delay, exponential-backoff, linear-backoff)
    #[arg(long)]
    pub strategy: Option<RetryStrategy>,

    /// Initial delay in milliseconds
    #[arg(long)]
    pub initial_delay_ms: Option<u64>,

    /// Maximum delay in milliseconds
    #[arg(long)]
    pub max_delay_ms: Option<u64>,

    /// Command to run
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective runtime configuration
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
