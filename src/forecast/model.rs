//! Seasonal-trend forecasting model.
//!
//! A univariate monthly model with multiplicative yearly seasonality:
//!
//! 1. estimate per-month seasonal indices from the ratio of each observation
//!    to a centered moving-average trend, normalized to mean 1
//! 2. deseasonalize the series and refit the trend as a straight line
//!    (weekly/daily structure does not exist at monthly granularity, so the
//!    only seasonal component is the yearly one)
//! 3. forecast `trend(t) * seasonal[t mod 12]` for the horizon, with a
//!    symmetric 95% interval from the training residual standard deviation,
//!    widened by the square root of the horizon step

use chrono::{Months, NaiveDate};

use crate::domain::ForecastPoint;
use crate::error::EtlError;
use crate::math::fit_line;

pub const MODEL_NAME: &str = "seasonal_trend";
pub const MODEL_VERSION: &str = "1.0";

/// Yearly seasonality on a monthly series.
pub const SEASONAL_PERIOD: usize = 12;

/// Minimum observations required to fit: two full seasonal cycles.
pub const MIN_OBSERVATIONS: usize = 24;

/// Months produced by one forecast run.
pub const DEFAULT_HORIZON: usize = 12;

/// Interval coverage for the bounds.
pub const CONFIDENCE_LEVEL: f64 = 0.95;
const Z_95: f64 = 1.96;

/// A fitted model for one (category, state) series.
#[derive(Debug, Clone)]
pub struct SeasonalTrendModel {
    /// Per-position multiplicative indices, mean 1.0. Position 0 is the
    /// month of the first training observation.
    seasonal: Vec<f64>,
    intercept: f64,
    slope: f64,
    residual_std: f64,
    n_obs: usize,
}

impl SeasonalTrendModel {
    /// Fit on a monthly series ordered by date.
    pub fn fit(values: &[f64]) -> Result<Self, EtlError> {
        if values.len() < MIN_OBSERVATIONS {
            return Err(EtlError::InsufficientData {
                required: MIN_OBSERVATIONS,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(EtlError::Model(
                "non-positive or non-finite observation in training series".to_string(),
            ));
        }

        let seasonal = seasonal_indices(values, SEASONAL_PERIOD);

        // The moving-average trend inside the decomposition only serves the
        // seasonal estimate; extrapolation uses the refitted line.
        let deseasonalized: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, v)| v / seasonal[i % SEASONAL_PERIOD])
            .collect();
        let (intercept, slope) = fit_line(&deseasonalized)
            .ok_or_else(|| EtlError::Model("trend fit failed: ill-conditioned system".to_string()))?;

        let residuals: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v - (intercept + slope * i as f64) * seasonal[i % SEASONAL_PERIOD]
            })
            .collect();
        let residual_std = sample_std_dev(&residuals);

        Ok(Self {
            seasonal,
            intercept,
            slope,
            residual_std,
            n_obs: values.len(),
        })
    }

    /// Forecast `horizon` months past the last observed date.
    pub fn forecast(
        &self,
        last_date: NaiveDate,
        horizon: usize,
        category: &str,
        state: &str,
    ) -> Vec<ForecastPoint> {
        (1..=horizon)
            .map(|h| {
                let idx = self.n_obs - 1 + h;
                let trend = self.intercept + self.slope * idx as f64;
                let predicted = trend * self.seasonal[idx % SEASONAL_PERIOD];
                let half_width = Z_95 * self.residual_std * (h as f64).sqrt();
                let forecast_date = last_date
                    .checked_add_months(Months::new(h as u32))
                    .unwrap_or(last_date);

                ForecastPoint {
                    forecast_date,
                    category: category.to_string(),
                    state: state.to_string(),
                    predicted_turnover: predicted,
                    // Turnover cannot go negative; clamp the lower bound.
                    lower_bound: (predicted - half_width).max(0.0),
                    upper_bound: predicted + half_width,
                    confidence_level: CONFIDENCE_LEVEL,
                    model_name: MODEL_NAME.to_string(),
                    model_version: MODEL_VERSION.to_string(),
                }
            })
            .collect()
    }

    /// Residual standard deviation on the training data (for diagnostics).
    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }
}

/// Per-position multiplicative seasonal indices, normalized to mean 1.0.
///
/// The trend is a 2x12 centered moving average (half weight on the window
/// endpoints), extended flat at the edges; indices are the per-position
/// means of the ratio to trend.
fn seasonal_indices(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let half = period / 2;

    let mut trend = vec![0.0; n];
    for i in half..(n - half) {
        let window = &values[i - half..=i + half];
        let sum = window[1..period].iter().sum::<f64>() + 0.5 * (window[0] + window[period]);
        trend[i] = sum / period as f64;
    }
    for i in 0..half {
        trend[i] = trend[half];
    }
    for i in (n - half)..n {
        trend[i] = trend[n - half - 1];
    }

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for i in 0..n {
        if trend[i] > 0.0 {
            sums[i % period] += values[i] / trend[i];
            counts[i % period] += 1;
        }
    }
    let mut seasonal: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 1.0 })
        .collect();

    // Normalize so the indices redistribute within the year rather than
    // rescaling the level.
    let mean = seasonal.iter().sum::<f64>() / period as f64;
    if mean > 0.0 {
        for s in &mut seasonal {
            *s /= mean;
        }
    }

    seasonal
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}
