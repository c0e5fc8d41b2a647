//! Least squares solver for the linear trend fit.
//!
//! The forecaster deseasonalizes a monthly series and then refits its trend
//! as a straight line `y = a + b t` over the observation index. That is a
//! tiny two-column regression, but we still solve it via SVD:
//!
//! - SVD handles tall (rows >> columns) systems robustly
//!   (a QR solve would panic on non-square matrices here)
//! - near-constant series produce near-collinear columns, so we accept the
//!   solution at progressively looser tolerances

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y = intercept + slope * i` over the index `i = 0..n`.
///
/// Returns `(intercept, slope)`, or `None` for fewer than two points or an
/// unsolvable system.
pub fn fit_line(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    if n < 2 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let x = DMatrix::<f64>::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { i as f64 });
    let y = DVector::<f64>::from_iterator(n, values.iter().copied());

    let beta = solve_least_squares(&x, &y)?;
    Some((beta[0], beta[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_recovers_known_line() {
        let values: Vec<f64> = (0..24).map(|i| 50.0 + 2.5 * i as f64).collect();
        let (intercept, slope) = fit_line(&values).unwrap();
        assert!((intercept - 50.0).abs() < 1e-9);
        assert!((slope - 2.5).abs() < 1e-9);
    }

    #[test]
    fn fit_line_on_constant_series_has_zero_slope() {
        let values = vec![100.0; 24];
        let (intercept, slope) = fit_line(&values).unwrap();
        assert!((intercept - 100.0).abs() < 1e-9);
        assert!(slope.abs() < 1e-9);
    }

    #[test]
    fn fit_line_rejects_degenerate_input() {
        assert_eq!(fit_line(&[]), None);
        assert_eq!(fit_line(&[1.0]), None);
        assert_eq!(fit_line(&[1.0, f64::NAN, 2.0]), None);
    }
}
