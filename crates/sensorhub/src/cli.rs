//! Clap derive structures for the `sensorhub` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sensorhub -- collect data from a fleet of sensor devices
#[derive(Debug, Parser)]
#[command(
    name = "sensorhub",
    version,
    about = "Poll a fleet of sensor devices and keep a local copy of their data",
    long_about = "Hub for a fleet of sensor devices.\n\n\
        Every device serves a status document and its raw CSV data. The hub\n\
        polls each device on a fixed interval and refreshes its local copy,\n\
        refusing any refresh that would lose rows.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the platform default
    #[arg(long, env = "SENSORHUB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the device copies (overrides config)
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SENSORHUB_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate device names, then poll every device until interrupted
    Run(RunArgs),

    /// Show the current status of every device
    #[command(alias = "st")]
    Status,

    /// Check that every device reports a distinct name
    Validate(ValidateArgs),

    /// Refresh local copies once, without waiting for the schedule
    Sync(SyncArgs),

    /// Manage the device address list
    #[command(alias = "addr")]
    Addresses(AddressesArgs),

    /// Delete stored data, logs, or configuration
    #[command(alias = "rm")]
    Remove(RemoveArgs),

    /// Print the directory holding the device copies
    DataPath,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Start even if some devices do not answer during name validation
    #[arg(long)]
    pub allow_partial: bool,

    /// Seconds between two syncs of the same device (overrides config)
    #[arg(long)]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Report unreachable devices instead of failing on them
    #[arg(long)]
    pub allow_partial: bool,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Sync only this address (default: every remote device)
    pub address: Option<String>,
}

#[derive(Debug, Args)]
pub struct AddressesArgs {
    #[command(subcommand)]
    pub command: AddressesCommand,
}

#[derive(Debug, Subcommand)]
pub enum AddressesCommand {
    /// Replace the address list with the entries of FILE (one per line)
    Set {
        /// File with one address per line; `self` names the hub's own device
        file: PathBuf,

        /// Store the list without asking the devices for their names
        #[arg(long)]
        skip_validation: bool,
    },

    /// Print the stored address list
    Show,

    /// Empty the address list
    Clear,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// What to delete
    #[arg(value_enum)]
    pub target: RemoveTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RemoveTarget {
    /// Device copies and leftover backups
    Data,
    /// Hub log files
    Logs,
    /// The config file
    Configs,
    /// All of the above
    All,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
