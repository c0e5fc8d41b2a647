//! ABS Data API integration for the Retail Trade (RT) monthly series.
//!
//! Responsibilities:
//! - fetch the raw series for a year-month window (blocking HTTP, CSV body)
//! - parse the SDMX-CSV response into `RawObservation`s with strict schema
//!   validation for required columns
//! - reduce the batch to the single canonical measurement variant
//!
//! The canonical-variant filter is the load-bearing correctness rule here:
//! without it, every (period, industry, region) triple carries several
//! conflicting rows and every downstream aggregate double-counts.

use std::collections::HashMap;
use std::time::Duration;

use csv::StringRecord;
use reqwest::blocking::Client;

use crate::domain::RawObservation;
use crate::error::EtlError;

const DEFAULT_BASE_URL: &str = "https://api.data.abs.gov.au/data";
const DATAFLOW: &str = "ABS,RT,1.0.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Widest historical window the monthly series covers.
pub const DEFAULT_START_PERIOD: &str = "1982-01";

/// Measurement-type code for the primary turnover measure.
pub const MEASURE_PRIMARY: &str = "1";
/// Series-type code for original (unadjusted) estimates.
pub const SERIES_ORIGINAL: &str = "10";

const REQUIRED_COLUMNS: &[&str] = &["time_period", "obs_value", "measure", "industry", "region"];

/// Parsed raw rows plus what the source actually gave us.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub rows: Vec<RawObservation>,
    /// False when the dataflow version omits the series-type column.
    pub has_series_type: bool,
}

/// Output of the canonical-variant filter.
#[derive(Debug, Clone)]
pub struct FilteredBatch {
    pub rows: Vec<RawObservation>,
    /// True when only the measurement-type filter could be applied
    /// (series-type column absent): duplicate variants may remain.
    pub degraded: bool,
}

pub struct AbsClient {
    client: Client,
    base_url: String,
}

impl AbsClient {
    pub fn from_env() -> Result<Self, EtlError> {
        dotenvy::dotenv().ok();
        let base_url =
            std::env::var("ABS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EtlError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Fetch raw observations for a year-month window.
    ///
    /// Defaults: `DEFAULT_START_PERIOD` through the current month. Network
    /// failure or a non-success status aborts with no data; there is no
    /// automatic retry.
    pub fn fetch_retail_sales(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<RawBatch, EtlError> {
        let url = format!("{}/{}/all", self.base_url, DATAFLOW);
        let start = start.unwrap_or(DEFAULT_START_PERIOD);
        let end_default;
        let end = match end {
            Some(e) => e,
            None => {
                end_default = chrono::Local::now().format("%Y-%m").to_string();
                &end_default
            }
        };

        tracing::info!(start, end, "fetching ABS retail series");

        let resp = self
            .client
            .get(&url)
            .query(&[("format", "csv"), ("startPeriod", start), ("endPeriod", end)])
            .send()
            .map_err(|e| EtlError::Source(format!("ABS request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(EtlError::Source(format!(
                "ABS request failed with status {}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .map_err(|e| EtlError::Source(format!("failed to read ABS response body: {e}")))?;

        let batch = parse_raw_csv(&body)?;
        tracing::info!(rows = batch.rows.len(), "ABS response parsed");
        Ok(batch)
    }
}

/// Parse an SDMX-CSV body into raw observations.
///
/// Missing required columns are a fatal validation error; individual
/// unreadable records are skipped.
pub fn parse_raw_csv(body: &str) -> Result<RawBatch, EtlError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| EtlError::Validation(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for col in REQUIRED_COLUMNS {
        if !header_map.contains_key(*col) {
            return Err(EtlError::Validation(format!(
                "missing required column: `{col}`"
            )));
        }
    }

    let has_series_type = header_map.contains_key("tsest");

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable CSV record");
                continue;
            }
        };

        let field = |name: &str| -> String {
            header_map
                .get(name)
                .and_then(|&idx| record.get(idx))
                .unwrap_or("")
                .to_string()
        };

        rows.push(RawObservation {
            time_period: field("time_period"),
            value: parse_value(&field("obs_value")),
            measure: field("measure"),
            industry: field("industry"),
            region: field("region"),
            series_type: if has_series_type {
                Some(field("tsest"))
            } else {
                None
            },
        });
    }

    Ok(RawBatch {
        rows,
        has_series_type,
    })
}

/// Reduce a raw batch to the single canonical variant per observation:
/// primary measure, original (unadjusted) series.
///
/// When the series-type column is absent, only the measurement-type filter
/// applies and the batch is marked degraded so the caller can warn.
/// Idempotent: re-filtering an already-filtered batch is a no-op.
pub fn filter_canonical(batch: RawBatch) -> FilteredBatch {
    let degraded = !batch.has_series_type;
    let rows: Vec<RawObservation> = batch
        .rows
        .into_iter()
        .filter(|r| {
            r.measure == MEASURE_PRIMARY
                && match &r.series_type {
                    Some(st) => st == SERIES_ORIGINAL,
                    None => true,
                }
        })
        .collect();

    FilteredBatch { rows, degraded }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // SDMX-CSV exports sometimes arrive with a BOM prefix on the first
    // header; without stripping it, schema validation would report the
    // column missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
