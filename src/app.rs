//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initializes logging
//! - parses CLI arguments
//! - opens the store and runs the requested pipeline
//! - prints reports

use clap::Parser;

use crate::cli::{Cli, Command, ForecastArgs, RunArgs, StoreArgs};
use crate::data::AbsClient;
use crate::domain::{EtlOptions, ForecastOptions};
use crate::error::EtlError;
use crate::store::Store;
use crate::transform::parse_period;

pub mod pipeline;

/// Entry point for the `retail` binary.
pub fn run() -> Result<(), EtlError> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Init(args) => handle_init(args),
        Command::Run(args) => handle_run(args),
        Command::Forecast(args) => handle_forecast(args),
        Command::Check(args) => handle_check(args),
        Command::Status(args) => handle_status(args),
    }
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn open_store(args: &StoreArgs) -> Result<Store, EtlError> {
    match &args.db {
        Some(path) => Store::open(path),
        None => Store::open_from_env(),
    }
}

fn handle_init(args: StoreArgs) -> Result<(), EtlError> {
    let store = open_store(&args)?;
    store.init_schema()?;
    store.seed_mappings()?;
    println!("store initialized (schema + code mappings)");
    Ok(())
}

fn handle_run(args: RunArgs) -> Result<(), EtlError> {
    validate_period_flag("--start", args.start.as_deref())?;
    validate_period_flag("--end", args.end.as_deref())?;

    let mut store = open_store(&args.store)?;
    // Idempotent: a run against a fresh database must still be able to
    // write facts and its audit record.
    store.init_schema()?;

    let client = AbsClient::from_env()?;
    let options = EtlOptions {
        start_period: args.start,
        end_period: args.end,
        batch_size: args.batch_size,
        force: args.force,
    };

    let run = pipeline::run_etl(&mut store, &client, &options)?;
    println!("{}", crate::report::format_etl_summary(&run));
    Ok(())
}

fn handle_forecast(args: ForecastArgs) -> Result<(), EtlError> {
    let mut store = open_store(&args.store)?;
    let options = ForecastOptions {
        category: args.category,
        state: args.state,
        horizon: args.horizon,
    };

    let summary = pipeline::run_forecast(&mut store, &options)?;
    println!("{}", crate::report::format_forecast_summary(&summary));
    Ok(())
}

fn handle_check(args: StoreArgs) -> Result<(), EtlError> {
    let store = open_store(&args)?;
    let report = pipeline::run_check(&store)?;
    println!("{}", crate::report::format_check_report(&report));
    Ok(())
}

fn handle_status(args: StoreArgs) -> Result<(), EtlError> {
    let store = open_store(&args)?;
    let status = pipeline::run_status(&store)?;
    println!("{}", crate::report::format_status(&status));
    Ok(())
}

fn validate_period_flag(flag: &str, value: Option<&str>) -> Result<(), EtlError> {
    match value {
        Some(v) if parse_period(v).is_none() => Err(EtlError::Config(format!(
            "{flag} must be a YYYY-MM period, got `{v}`"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_flags_accept_year_month_only() {
        assert!(validate_period_flag("--start", None).is_ok());
        assert!(validate_period_flag("--start", Some("1982-01")).is_ok());
        assert!(validate_period_flag("--start", Some("January 1982")).is_err());
    }
}
