//! Formatted terminal output for run summaries and maintenance commands.
//!
//! We keep formatting code in one place so:
//! - pipeline code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{CheckReport, EtlRunOutput, StoreStatus};
use crate::forecast::ForecastSummary;

/// Failed scopes shown before the list is truncated.
const MAX_FAILED_SHOWN: usize = 10;

/// Format the ETL run summary (stage counts + verification).
pub fn format_etl_summary(run: &EtlRunOutput) -> String {
    let mut out = String::new();

    out.push_str("=== retail - ETL run ===\n");
    out.push_str(&format!("Extracted : {} raw rows\n", run.raw_rows));
    out.push_str(&format!(
        "Filtered  : {} canonical rows{}\n",
        run.filtered_rows,
        if run.degraded_filter {
            " (degraded: measurement-type filter only)"
        } else {
            ""
        }
    ));
    out.push_str(&format!(
        "Transformed: {} facts ({} unparseable dates, {} non-positive values dropped)\n",
        run.transform.rows_used,
        run.transform.dropped_unparseable,
        run.transform.dropped_nonpositive
    ));
    out.push_str(&format!(
        "Loaded    : {} rows ({} -> {} in store, {} failed chunks)\n",
        run.load.inserted, run.load.records_before, run.load.records_after, run.load.failed_chunks
    ));
    out.push_str(&format!("Elapsed   : {:.2}s\n", run.elapsed_seconds));

    out
}

/// Format the forecast batch summary, truncating a long failure list.
pub fn format_forecast_summary(summary: &ForecastSummary) -> String {
    let mut out = String::new();

    out.push_str("=== retail - forecast run ===\n");
    out.push_str(&format!("Scopes    : {}\n", summary.scopes_total));
    out.push_str(&format!("Successful: {}\n", summary.successful));
    out.push_str(&format!("Failed    : {}\n", summary.failed));
    out.push_str(&format!(
        "Forecasts : {} monthly predictions\n",
        summary.points_written
    ));
    out.push_str(&format!("Elapsed   : {:.2}s\n", summary.elapsed_seconds));

    if !summary.failed_scopes.is_empty() {
        out.push_str("\nFailed scopes:\n");
        for scope in summary.failed_scopes.iter().take(MAX_FAILED_SHOWN) {
            out.push_str(&format!(
                "  - {}-{}: {}\n",
                scope.category, scope.state, scope.reason
            ));
        }
        if summary.failed_scopes.len() > MAX_FAILED_SHOWN {
            out.push_str(&format!(
                "  ... and {} more\n",
                summary.failed_scopes.len() - MAX_FAILED_SHOWN
            ));
        }
    }

    out
}

/// Format the stored-data quality verdict.
pub fn format_check_report(report: &CheckReport) -> String {
    let mut out = String::new();

    out.push_str("=== retail - data quality check ===\n");
    out.push_str(&format!("Facts stored        : {}\n", report.fact_count));
    out.push_str(&format!("Null date/turnover  : {}\n", report.null_rows));
    out.push_str(&format!(
        "Non-positive values : {}\n",
        report.nonpositive_rows
    ));
    out.push_str(&format!(
        "Duplicate keys      : {}\n",
        report.duplicate_keys.len()
    ));

    for (date, category, state, count) in report.duplicate_keys.iter().take(MAX_FAILED_SHOWN) {
        out.push_str(&format!(
            "  - {date} category={category} state={state} x{count}\n"
        ));
    }
    if report.duplicate_keys.len() > MAX_FAILED_SHOWN {
        out.push_str(&format!(
            "  ... and {} more\n",
            report.duplicate_keys.len() - MAX_FAILED_SHOWN
        ));
    }

    out.push_str(if report.passed() {
        "\nVerdict: PASS\n"
    } else {
        "\nVerdict: FAIL\n"
    });

    out
}

/// Format the store health snapshot.
pub fn format_status(status: &StoreStatus) -> String {
    let mut out = String::new();

    out.push_str("=== retail - store status ===\n");
    out.push_str(&format!("Facts     : {}\n", status.fact_count));
    out.push_str(&format!("Forecasts : {}\n", status.forecast_count));
    out.push_str(&format!("Scopes    : {}\n", status.scope_count));
    match status.date_range {
        Some((min, max)) => out.push_str(&format!("Date range: {min} to {max}\n")),
        None => out.push_str("Date range: (empty)\n"),
    }

    if !status.recent_logs.is_empty() {
        out.push_str("\nRecent jobs:\n");
        for log in &status.recent_logs {
            out.push_str(&format!(
                "  {} {} {} rows at {}\n",
                log.job_name, log.status, log.records_inserted, log.completed_at
            ));
        }
    }

    out
}
