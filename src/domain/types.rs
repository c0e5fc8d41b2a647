//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during transformation and forecasting
//! - persisted to / read back from the SQLite store
//! - exported or inspected by maintenance commands

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw row from the ABS Retail Trade series, consumed verbatim.
///
/// Multiple measurement variants exist per (time_period, industry, region);
/// `data::filter_canonical` reduces them to the single canonical one.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    /// Time-period label as published (e.g. `"1982-04"`).
    pub time_period: String,
    /// Observed value; absent when the source publishes an empty cell.
    pub value: Option<f64>,
    /// Measurement-type code (the primary turnover measure is `"1"`).
    pub measure: String,
    /// Industry (retail category) code.
    pub industry: String,
    /// Region (state or national aggregate) code.
    pub region: String,
    /// Series-type code (original / seasonally adjusted / trend).
    /// Absent in dataflow versions that omit the column.
    pub series_type: Option<String>,
}

/// A clean monthly fact for one (category, state).
///
/// Natural key is (sale_date, category, state); duplicates are a
/// data-integrity defect caught by the loader's quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesFact {
    /// First day of the observation month.
    pub sale_date: NaiveDate,
    /// Industry code, verbatim (display names live in `category_mapping`).
    pub category: String,
    /// Region code, verbatim (display names live in `state_mapping`).
    pub state: String,
    /// Turnover in millions AUD; always > 0 after cleaning.
    pub turnover: f64,
    pub month_name: String,
    pub year: i32,
    /// 12-month percentage change, 2 dp; absent for the first year of a
    /// (category, state) series.
    pub growth_rate_yoy: Option<f64>,
    pub data_source: String,
}

impl SalesFact {
    /// The (sale_date, category, state) triple identifying this fact.
    pub fn natural_key(&self) -> (NaiveDate, &str, &str) {
        (self.sale_date, &self.category, &self.state)
    }
}

/// One forecast month for a (category, state) scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// First day of the forecast month.
    pub forecast_date: NaiveDate,
    pub category: String,
    pub state: String,
    pub predicted_turnover: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Interval coverage (e.g. 0.95).
    pub confidence_level: f64,
    pub model_name: String,
    pub model_version: String,
}

/// Terminal status of one job for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
        }
    }
}

/// Audit record appended to `etl_logs` after each job.
#[derive(Debug, Clone)]
pub struct EtlJobLog {
    pub job_name: String,
    pub status: JobStatus,
    pub records_processed: usize,
    pub records_inserted: usize,
    pub records_updated: usize,
    pub error_message: Option<String>,
    pub execution_time_seconds: f64,
}

/// A stored `etl_logs` row as read back for status reporting.
#[derive(Debug, Clone)]
pub struct EtlLogRow {
    pub job_name: String,
    pub status: String,
    pub records_inserted: i64,
    pub completed_at: String,
}

/// Options for one ETL run (derived from CLI flags plus defaults).
#[derive(Debug, Clone)]
pub struct EtlOptions {
    /// First period to extract (`YYYY-MM`); wide historical default.
    pub start_period: Option<String>,
    /// Last period to extract (`YYYY-MM`); defaults to the current month.
    pub end_period: Option<String>,
    /// Rows per insert chunk.
    pub batch_size: usize,
    /// Load even if the quality gate fails.
    pub force: bool,
}

/// Options for one forecast run.
#[derive(Debug, Clone)]
pub struct ForecastOptions {
    /// Restrict to one category code (with `state`).
    pub category: Option<String>,
    /// Restrict to one state code (with `category`).
    pub state: Option<String>,
    /// Months to forecast past the last observation.
    pub horizon: usize,
}

/// ABS standard region codes: sub-national jurisdictions plus the national
/// aggregate. (code, short name, full name)
pub const KNOWN_STATES: &[(&str, &str, &str)] = &[
    ("1", "NSW", "New South Wales"),
    ("2", "VIC", "Victoria"),
    ("3", "QLD", "Queensland"),
    ("4", "SA", "South Australia"),
    ("5", "WA", "Western Australia"),
    ("6", "TAS", "Tasmania"),
    ("7", "NT", "Northern Territory"),
    ("8", "ACT", "Australian Capital Territory"),
    ("AUS", "Australia", "Australia (Total)"),
];

/// ABS Retail Trade industry codes. (code, name, description)
pub const KNOWN_CATEGORIES: &[(&str, &str, &str)] = &[
    (
        "20",
        "Total Retail Trade",
        "Total of all retail trade industries",
    ),
    (
        "41",
        "Food Retailing",
        "Supermarkets, grocery stores, fresh food",
    ),
    (
        "42",
        "Household Goods Retailing",
        "Furniture, electrical, hardware",
    ),
    (
        "43",
        "Clothing & Footwear",
        "Fashion, apparel, shoes, accessories",
    ),
    (
        "44",
        "Department Stores",
        "Large department stores and variety stores",
    ),
    ("45", "Other Retailing", "Other specialized retail stores"),
    (
        "46",
        "Cafes & Restaurants",
        "Food service and dining establishments",
    ),
];

/// Whether a region code is in the known ABS set.
///
/// Unknown codes are passed through and logged, never rejected: the source
/// occasionally adds codes before the reference tables catch up.
pub fn is_known_state(code: &str) -> bool {
    KNOWN_STATES.iter().any(|(c, _, _)| *c == code)
}

/// Whether an industry code is in the known ABS set.
pub fn is_known_category(code: &str) -> bool {
    KNOWN_CATEGORIES.iter().any(|(c, _, _)| *c == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_key_reflects_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let fact = SalesFact {
            sale_date: date,
            category: "20".to_string(),
            state: "AUS".to_string(),
            turnover: 100.0,
            month_name: "January".to_string(),
            year: 2024,
            growth_rate_yoy: None,
            data_source: "ABS_RT".to_string(),
        };
        assert_eq!(fact.natural_key(), (date, "20", "AUS"));
    }

    #[test]
    fn known_code_lookups() {
        assert!(is_known_state("AUS"));
        assert!(is_known_state("3"));
        assert!(!is_known_state("ZZ"));
        assert!(is_known_category("20"));
        assert!(!is_known_category("99"));
    }
}
