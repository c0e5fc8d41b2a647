//! Shared pipeline logic used by the CLI subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflows:
//!
//! - ETL: extract -> canonical filter -> transform -> quality gate -> load -> audit
//! - forecast: scope discovery -> per-scope train/persist -> audit
//! - maintenance: stored-data quality scan, store health snapshot
//!
//! The CLI layer then focuses on argument handling and printing.

use std::time::Instant;

use chrono::NaiveDate;

use crate::data::{AbsClient, filter_canonical};
use crate::domain::{EtlJobLog, EtlLogRow, EtlOptions, ForecastOptions, JobStatus};
use crate::error::EtlError;
use crate::forecast::{ForecastSummary, forecast_all};
use crate::store::{LoadOutcome, Store, load_facts, quality_gate};
use crate::transform::{TransformReport, transform};

/// All computed outputs of a single ETL run.
#[derive(Debug, Clone)]
pub struct EtlRunOutput {
    pub raw_rows: usize,
    pub filtered_rows: usize,
    /// True when the canonical filter ran without a series-type column.
    pub degraded_filter: bool,
    pub transform: TransformReport,
    pub load: LoadOutcome,
    pub elapsed_seconds: f64,
}

/// Execute the full ETL pipeline and append an audit record.
pub fn run_etl(
    store: &mut Store,
    client: &AbsClient,
    options: &EtlOptions,
) -> Result<EtlRunOutput, EtlError> {
    let started = Instant::now();

    let raw = client.fetch_retail_sales(
        options.start_period.as_deref(),
        options.end_period.as_deref(),
    )?;
    let raw_rows = raw.rows.len();

    let filtered = filter_canonical(raw);
    if filtered.degraded {
        tracing::warn!(
            "series-type column absent: filtered on measurement type only, duplicates may remain"
        );
    }
    let filtered_rows = filtered.rows.len();

    let output = transform(&filtered.rows)?;

    if let Err(gate) = quality_gate(&output.facts) {
        if options.force {
            tracing::warn!(error = %gate, "quality gate failed; continuing due to --force");
        } else {
            log_job_outcome(
                store,
                "retail_etl",
                JobStatus::Failed,
                raw_rows,
                0,
                Some(gate.to_string()),
                started.elapsed().as_secs_f64(),
            );
            return Err(gate);
        }
    }

    let load = load_facts(store, &output.facts, options.batch_size)?;
    let elapsed_seconds = started.elapsed().as_secs_f64();

    log_job_outcome(
        store,
        "retail_etl",
        JobStatus::Success,
        raw_rows,
        load.inserted,
        None,
        elapsed_seconds,
    );

    Ok(EtlRunOutput {
        raw_rows,
        filtered_rows,
        degraded_filter: filtered.degraded,
        transform: output.report,
        load,
        elapsed_seconds,
    })
}

/// Execute a forecast run and append an audit record.
pub fn run_forecast(
    store: &mut Store,
    options: &ForecastOptions,
) -> Result<ForecastSummary, EtlError> {
    let summary = forecast_all(store, options)?;

    let status = if summary.successful == 0 && summary.failed > 0 {
        JobStatus::Failed
    } else {
        JobStatus::Success
    };
    log_job_outcome(
        store,
        "forecast_all",
        status,
        summary.scopes_total,
        summary.points_written,
        None,
        summary.elapsed_seconds,
    );

    Ok(summary)
}

/// The audit record must never mask the run's own outcome.
fn log_job_outcome(
    store: &Store,
    job_name: &str,
    status: JobStatus,
    records_processed: usize,
    records_inserted: usize,
    error_message: Option<String>,
    execution_time_seconds: f64,
) {
    let log = EtlJobLog {
        job_name: job_name.to_string(),
        status,
        records_processed,
        records_inserted,
        records_updated: 0,
        error_message,
        execution_time_seconds,
    };
    if let Err(e) = store.log_job(&log) {
        tracing::warn!(job = job_name, error = %e, "could not append audit record");
    }
}

/// Stored-data quality scan results.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub fact_count: i64,
    pub null_rows: i64,
    pub nonpositive_rows: i64,
    pub duplicate_keys: Vec<(String, String, String, i64)>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.null_rows == 0 && self.nonpositive_rows == 0 && self.duplicate_keys.is_empty()
    }
}

/// Run the quality checks against the stored facts.
pub fn run_check(store: &Store) -> Result<CheckReport, EtlError> {
    Ok(CheckReport {
        fact_count: store.fact_count()?,
        null_rows: store.stored_null_count()?,
        nonpositive_rows: store.stored_nonpositive_count()?,
        duplicate_keys: store.stored_duplicate_keys()?,
    })
}

/// Store health snapshot for the status command.
#[derive(Debug, Clone)]
pub struct StoreStatus {
    pub fact_count: i64,
    pub forecast_count: i64,
    pub scope_count: i64,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub recent_logs: Vec<EtlLogRow>,
}

pub fn run_status(store: &Store) -> Result<StoreStatus, EtlError> {
    Ok(StoreStatus {
        fact_count: store.fact_count()?,
        forecast_count: store.forecast_count()?,
        scope_count: store.scope_count()?,
        date_range: store.fact_date_range()?,
        recent_logs: store.recent_logs(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SalesFact;
    use crate::store::DEFAULT_BATCH_SIZE;

    fn test_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    fn fact(month: u32, turnover: f64) -> SalesFact {
        let sale_date = NaiveDate::from_ymd_opt(2024, month, 1).unwrap();
        SalesFact {
            sale_date,
            category: "20".to_string(),
            state: "AUS".to_string(),
            turnover,
            month_name: sale_date.format("%B").to_string(),
            year: 2024,
            growth_rate_yoy: None,
            data_source: "ABS_RT".to_string(),
        }
    }

    #[test]
    fn check_report_passes_on_clean_store() {
        let mut store = test_store();
        store
            .insert_facts(&[fact(1, 100.0), fact(2, 110.0)])
            .unwrap();

        let report = run_check(&store).unwrap();
        assert!(report.passed());
        assert_eq!(report.fact_count, 2);
    }

    #[test]
    fn check_report_flags_stored_duplicates() {
        let mut store = test_store();
        store
            .insert_facts(&[fact(1, 100.0), fact(1, 100.0)])
            .unwrap();

        let report = run_check(&store).unwrap();
        assert!(!report.passed());
        assert_eq!(report.duplicate_keys.len(), 1);
    }

    #[test]
    fn status_snapshot_reflects_store_contents() {
        let mut store = test_store();
        store
            .insert_facts(&[fact(1, 100.0), fact(2, 110.0)])
            .unwrap();

        let status = run_status(&store).unwrap();
        assert_eq!(status.fact_count, 2);
        assert_eq!(status.forecast_count, 0);
        assert_eq!(status.scope_count, 1);
        let (min, max) = status.date_range.unwrap();
        assert_eq!(min, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(max, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn forecast_run_appends_an_audit_record() {
        let mut store = test_store();
        let mut facts = Vec::new();
        for m in 0..26 {
            let year = 2020 + (m / 12) as i32;
            let month = (m % 12) as u32 + 1;
            let sale_date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
            facts.push(SalesFact {
                sale_date,
                category: "20".to_string(),
                state: "AUS".to_string(),
                turnover: 100.0,
                month_name: sale_date.format("%B").to_string(),
                year,
                growth_rate_yoy: None,
                data_source: "ABS_RT".to_string(),
            });
        }
        store.insert_facts(&facts).unwrap();

        let summary = run_forecast(
            &mut store,
            &ForecastOptions {
                category: None,
                state: None,
                horizon: 12,
            },
        )
        .unwrap();
        assert_eq!(summary.successful, 1);

        let logs = store.recent_logs(1).unwrap();
        assert_eq!(logs[0].job_name, "forecast_all");
        assert_eq!(logs[0].status, "SUCCESS");
    }

    #[test]
    fn csv_to_store_end_to_end_without_network() {
        // Two measurement variants per month; only the canonical one may
        // survive into the store.
        let mut body = String::from(
            "DATAFLOW,MEASURE,INDUSTRY,TSEST,REGION,FREQ,TIME_PERIOD,OBS_VALUE\n",
        );
        for m in 1..=3 {
            body.push_str(&format!(
                "ABS:RT(1.0.0),1,20,10,AUS,M,2024-{m:02},{}\n",
                100.0 + m as f64
            ));
            body.push_str(&format!(
                "ABS:RT(1.0.0),1,20,20,AUS,M,2024-{m:02},{}\n",
                90.0 + m as f64
            ));
        }

        let batch = crate::data::parse_raw_csv(&body).unwrap();
        let filtered = crate::data::filter_canonical(batch);
        assert!(!filtered.degraded);
        assert_eq!(filtered.rows.len(), 3);

        let output = transform(&filtered.rows).unwrap();
        quality_gate(&output.facts).unwrap();

        let mut store = test_store();
        let outcome = load_facts(&mut store, &output.facts, DEFAULT_BATCH_SIZE).unwrap();
        assert_eq!(outcome.inserted, 3);
        assert_eq!(outcome.records_after, 3);

        let stored = store.facts_for_scope("20", "AUS").unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].turnover, 101.0);
    }
}
