use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "day-tally")]
#[command(about = "Per-person daily file counts from archived workspaces", long_about = None)]
pub struct Cli {
    /// Plain log lines: no spinner, no colors, no pretty layout
    #[arg(long, global = true)]
    pub plain: bool,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags that take precedence over `Tally.toml` and `TALLY__*` variables.
#[derive(Debug, Args)]
pub struct Overrides {
    /// Root directory holding the subject folders
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
    /// Store location (`postgres://...`, `sqlite://path`, a file path or `:memory:`)
    #[arg(long, global = true)]
    pub database_url: Option<String>,
    /// First day of the window (inclusive), YYYY-MM-DD
    #[arg(long, global = true)]
    pub start: Option<NaiveDate>,
    /// Day after the window (exclusive), YYYY-MM-DD
    #[arg(long, global = true)]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan subject folders and upsert the daily counts
    Scan(ScanArgs),
    /// List rows already in the store
    Show {
        /// Only rows for this person
        #[arg(long)]
        person: Option<String>,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Aggregate only; do not touch the store
    #[arg(long)]
    pub dry_run: bool,
    /// Also write the aggregate to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}
