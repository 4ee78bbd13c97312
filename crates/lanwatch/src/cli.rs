//! Clap derive structures for the `lanwatch` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lanwatch -- presence tracking for LAN devices
#[derive(Debug, Parser)]
#[command(
    name = "lanwatch",
    version,
    about = "Track device presence on your LAN from discovery snapshots",
    long_about = "Ingests periodic device-discovery snapshots (arp-scan style), keeps a\n\
        durable presence history, and reports arrivals, departures, and flapping.\n\n\
        Scanning, scheduling, and notification delivery are external: lanwatch\n\
        consumes well-formed snapshot JSON and produces state, history, and events.",
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
    /// Config file path (defaults to the platform config dir)
    #[arg(long, env = "LANWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding the store file (overrides config)
    #[arg(long, env = "LANWATCH_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LANWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest a snapshot submission and emit presence events
    #[command(alias = "in")]
    Ingest(IngestArgs),

    /// Show current per-device presence state
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Show recent presence events
    #[command(alias = "ev")]
    Events(EventsArgs),

    /// Uptime ratio for one device over a window
    Uptime(UptimeArgs),

    /// Device counts over time
    Count(CountArgs),

    /// Validate a snapshot submission file without ingesting it
    Validate(ValidateArgs),

    /// Remove history and events older than a horizon
    Prune(PruneArgs),
}

// ── Per-command args ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Snapshot JSON file, or '-' for stdin
    pub file: String,

    /// Classify against current state but do not commit
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show devices currently present
    #[arg(long)]
    pub present_only: bool,
}

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Maximum number of events to show (newest first)
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct UptimeArgs {
    /// Hardware address of the device
    pub address: String,

    /// Window to evaluate, ending now (humantime, e.g. "24h", "7d")
    #[arg(long, default_value = "24h")]
    pub window: String,
}

#[derive(Debug, Args)]
pub struct CountArgs {
    /// Window to evaluate, ending now (humantime)
    #[arg(long, default_value = "24h")]
    pub window: String,

    /// Bucket size (humantime)
    #[arg(long, default_value = "1h")]
    pub bucket: String,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Snapshot JSON file to validate
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct PruneArgs {
    /// Remove records older than this (humantime). Falls back to the
    /// configured history_retention when omitted.
    #[arg(long)]
    pub older_than: Option<String>,
}
