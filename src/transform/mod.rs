//! Raw observations to clean monthly sales facts.
//!
//! This is a pure function over a batch: no database access, deterministic
//! output. Steps, in order:
//!
//! 1. reject an empty batch (fatal input error)
//! 2. parse time-period labels to first-of-month dates (bad labels dropped
//!    and counted)
//! 3. drop missing / non-positive values (counted): zero or negative
//!    turnover is a no-data sentinel, never a real observation
//! 4. carry industry/region codes through verbatim as category/state keys
//! 5. compute year-over-year growth per (category, state) group
//! 6. project to the `SalesFact` shape
//!
//! Growth must run after cleaning so the counters above are final before
//! the lag is applied.

use chrono::{Datelike, NaiveDate};

use crate::domain::{RawObservation, SalesFact, is_known_category, is_known_state};
use crate::error::EtlError;

/// Tag stamped on every fact produced here.
pub const DATA_SOURCE: &str = "ABS_RT";

/// Year-over-year lag in months.
const YOY_LAG: usize = 12;

/// Row counters for one transform invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub rows_read: usize,
    pub rows_used: usize,
    /// Labels that failed every supported parse pattern.
    pub dropped_unparseable: usize,
    /// Rows with a missing, non-finite, or non-positive value.
    pub dropped_nonpositive: usize,
}

/// Output of one transform invocation: facts plus drop counters.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub facts: Vec<SalesFact>,
    pub report: TransformReport,
}

/// Transform a batch of raw observations into clean sales facts.
pub fn transform(rows: &[RawObservation]) -> Result<TransformOutput, EtlError> {
    if rows.is_empty() {
        return Err(EtlError::Validation(
            "empty raw batch: nothing to transform".to_string(),
        ));
    }

    let mut report = TransformReport {
        rows_read: rows.len(),
        ..TransformReport::default()
    };
    let mut facts = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(date) = parse_period(&row.time_period) else {
            report.dropped_unparseable += 1;
            continue;
        };

        let turnover = match row.value {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => {
                report.dropped_nonpositive += 1;
                continue;
            }
        };

        if !is_known_category(&row.industry) {
            tracing::debug!(code = %row.industry, "unrecognized industry code passed through");
        }
        if !is_known_state(&row.region) {
            tracing::debug!(code = %row.region, "unrecognized region code passed through");
        }

        facts.push(SalesFact {
            sale_date: date,
            category: row.industry.clone(),
            state: row.region.clone(),
            turnover,
            month_name: date.format("%B").to_string(),
            year: date.year(),
            growth_rate_yoy: None,
            data_source: DATA_SOURCE.to_string(),
        });
    }

    compute_growth(&mut facts);
    report.rows_used = facts.len();

    if report.dropped_unparseable > 0 || report.dropped_nonpositive > 0 {
        tracing::warn!(
            unparseable = report.dropped_unparseable,
            nonpositive = report.dropped_nonpositive,
            "dropped defective rows during transform"
        );
    }

    Ok(TransformOutput { facts, report })
}

/// Parse a time-period label to a first-of-month date.
///
/// Supported shapes: `"YYYY-MM"` and a full calendar-date fallback
/// (`"YYYY-MM-DD"`, snapped to the first of its month).
pub fn parse_period(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{label}-01"), "%Y-%m-%d") {
        return Some(d);
    }
    NaiveDate::parse_from_str(label, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.with_day(1))
}

/// Year-over-year growth per (category, state) group, sorted by date:
/// `round(100 * (v_t / v_{t-12} - 1), 2)`, absent for each group's first
/// twelve rows.
///
/// Positional lag: computed after row-dropping, so a gap inside a cleaned
/// series shifts the comparison month rather than skipping the row.
fn compute_growth(facts: &mut [SalesFact]) {
    facts.sort_by(|a, b| {
        (a.category.as_str(), a.state.as_str(), a.sale_date).cmp(&(
            b.category.as_str(),
            b.state.as_str(),
            b.sale_date,
        ))
    });

    let mut start = 0;
    while start < facts.len() {
        let mut end = start + 1;
        while end < facts.len()
            && facts[end].category == facts[start].category
            && facts[end].state == facts[start].state
        {
            end += 1;
        }

        for i in (start + YOY_LAG)..end {
            let prev = facts[i - YOY_LAG].turnover;
            let cur = facts[i].turnover;
            if prev > 0.0 {
                facts[i].growth_rate_yoy = Some(round2(100.0 * (cur / prev - 1.0)));
            }
        }

        start = end;
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
