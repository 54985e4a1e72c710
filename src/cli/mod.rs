//! Command-line parsing for the housing market pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! metrics and I/O code. Arg structs are converted to a `PipelineConfig` in
//! `app`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::data::ZHVI_URL;
use crate::domain::Granularity;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "pulse",
    version,
    about = "Housing market snapshot pipeline (Zillow ZHVI-based)"
)]
pub struct Cli {
    /// Log debug detail.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download the ZHVI CSV (with retry); write placeholder markets if every attempt fails.
    Fetch(FetchArgs),
    /// Compute and write `market.json` for one ZIP code.
    Metrics(MetricsArgs),
    /// Append rule-based weekly insights to an existing `market.json`.
    Insights(InsightsArgs),
    /// Write advisory notes (`ai_insights.json`) for the given ZIP codes.
    Advise(AdviseArgs),
    /// Aggregate per-ZIP market files into `dashboard.json`.
    Dashboard(DashboardArgs),
    /// Write a seeded synthetic ZHVI CSV for offline runs.
    Simulate(SimulateArgs),
    /// Run the whole pipeline: fetch, metrics + insights per ZIP, advise, dashboard, report.
    ///
    /// This is the default when no subcommand is given (`pulse 31093` is `pulse run 31093`).
    Run(RunArgs),
}

/// Options shared by every command that reads or writes market files.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Root of the per-ZIP output tree.
    #[arg(long, default_value = "data/houston-county-ga")]
    pub data_root: PathBuf,

    /// Explicit ZHVI CSV path (skips the default search locations).
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Market name written into each file.
    #[arg(long, default_value = "Houston County, GA")]
    pub market_name: String,

    /// Period tag written into each file.
    #[arg(long, value_enum, default_value_t = Granularity::Monthly)]
    pub granularity: Granularity,

    /// Number of trailing periods kept as history.
    #[arg(long, default_value_t = 4)]
    pub history_len: usize,
}

/// Download retry options.
#[derive(Debug, Args, Clone)]
pub struct RetryArgs {
    /// Source CSV URL.
    #[arg(long, default_value = ZHVI_URL)]
    pub url: String,

    /// Maximum download attempts.
    #[arg(long, default_value_t = 3)]
    pub retries: usize,

    /// Fixed sleep between attempts (seconds).
    #[arg(long, default_value_t = 5)]
    pub backoff_secs: u64,

    /// Per-request timeout (seconds).
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    /// ZIP codes that receive placeholder markets if the download fails.
    pub zips: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub retry: RetryArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct MetricsArgs {
    /// ZIP code (default 31088).
    pub zip: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Do not print the market summary.
    #[arg(long)]
    pub no_summary: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct InsightsArgs {
    /// ZIP code (default 31088).
    pub zip: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct AdviseArgs {
    /// ZIP codes (default: every ZIP in the market profile).
    pub zips: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Advisory request timeout (seconds).
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[derive(Debug, Parser, Clone)]
pub struct DashboardArgs {
    /// ZIP codes (default: every ZIP in the market profile).
    pub zips: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// ZIP codes (default: every ZIP in the market profile).
    pub zips: Vec<String>,

    /// Output CSV path.
    #[arg(long, default_value = "tmp/zillow_zhvi.csv")]
    pub out: PathBuf,

    /// Number of monthly columns.
    #[arg(long, default_value_t = 12)]
    pub months: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Last month of the series (YYYY-MM-DD, default today).
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// ZIP codes (default: every ZIP in the market profile).
    pub zips: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub retry: RetryArgs,

    /// Use whatever CSV is already on disk.
    #[arg(long, conflicts_with = "offline")]
    pub skip_fetch: bool,

    /// Generate a synthetic CSV instead of downloading.
    #[arg(long)]
    pub offline: bool,

    /// Seed for `--offline`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Advisory request timeout (seconds).
    #[arg(long, default_value_t = 30)]
    pub advise_timeout_secs: u64,
}
