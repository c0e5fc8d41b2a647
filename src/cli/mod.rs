//! Command-line parsing for the retail ETL and forecasting tool.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the pipeline code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::forecast::model::DEFAULT_HORIZON;
use crate::store::DEFAULT_BATCH_SIZE;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "retail",
    version,
    about = "Australian retail sales ETL & forecasting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the store schema and seed the code mapping tables.
    Init(StoreArgs),
    /// Run the full pipeline: extract from the ABS API, transform, load.
    Run(RunArgs),
    /// Train and persist forecasts for every scope with enough history,
    /// or one scope with --category/--state.
    Forecast(ForecastArgs),
    /// Run data-quality checks against the stored facts.
    Check(StoreArgs),
    /// Show store health: row counts, date range, recent jobs.
    Status(StoreArgs),
}

/// Options shared by every subcommand that touches the store.
#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// SQLite database path (defaults to $RETAIL_DB_PATH, then ./retail.db).
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Options for the ETL pipeline.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// First period to extract (YYYY-MM; defaults to the start of the series).
    #[arg(long)]
    pub start: Option<String>,

    /// Last period to extract (YYYY-MM; defaults to the current month).
    #[arg(long)]
    pub end: Option<String>,

    /// Rows per insert chunk.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Load even if the quality gate fails.
    #[arg(long)]
    pub force: bool,
}

/// Options for forecast runs.
#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Restrict to one category code (requires --state).
    #[arg(long)]
    pub category: Option<String>,

    /// Restrict to one state code (requires --category).
    #[arg(long, requires = "category")]
    pub state: Option<String>,

    /// Months to forecast past the last observation.
    #[arg(long, default_value_t = DEFAULT_HORIZON)]
    pub horizon: usize,
}
