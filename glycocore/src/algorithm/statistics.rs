use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};
use statrs::function::factorial::binomial;
use statrs::statistics::Statistics;

use crate::error::{GlycoError, Result};

/// Residuals beyond this many standard deviations are flagged as outliers.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 2.5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    /// Indices into the fitted arrays.
    pub outliers: Vec<usize>,
}

impl RegressionResult {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// fit a least-squares line and flag points with large residuals
///
/// Arguments:
///
/// * `x` - independent values
/// * `y` - dependent values, same length as `x`
/// * `threshold` - outlier cutoff in population standard deviations of the residuals
///
/// Returns:
///
/// * `RegressionResult` - slope, intercept and outlier indices
///
/// # Examples
///
/// ```
/// use glycocore::algorithm::statistics::{robust_linear_fit, DEFAULT_OUTLIER_THRESHOLD};
///
/// let fit = robust_linear_fit(&[1.0], &[5.0], DEFAULT_OUTLIER_THRESHOLD).unwrap();
/// assert_eq!((fit.slope, fit.intercept), (0.0, 5.0));
///
/// let fit = robust_linear_fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0], DEFAULT_OUTLIER_THRESHOLD).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!(fit.outliers.is_empty());
/// ```
pub fn robust_linear_fit(x: &[f64], y: &[f64], threshold: f64) -> Result<RegressionResult> {
    if x.len() != y.len() {
        return Err(GlycoError::Shape {
            left: x.len(),
            right: y.len(),
        });
    }
    match x.len() {
        0 => return Ok(RegressionResult::default()),
        1 => {
            return Ok(RegressionResult {
                slope: 0.0,
                intercept: y[0],
                outliers: Vec::new(),
            })
        }
        _ => {}
    }

    let mean_x = x.mean();
    let mean_y = y.mean();
    let (sxx, sxy) = x.iter().zip(y).fold((0.0, 0.0), |(sxx, sxy), (xi, yi)| {
        let dx = xi - mean_x;
        (sxx + dx * dx, sxy + dx * (yi - mean_y))
    });
    if sxx == 0.0 {
        return Err(GlycoError::DegenerateFit);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let residuals: Vec<f64> = x.iter().zip(y).map(|(xi, yi)| yi - (slope * xi + intercept)).collect();
    let cutoff = threshold * residuals.iter().population_std_dev();

    let outliers: Vec<usize> = residuals
        .iter()
        .enumerate()
        .filter(|(_, residual)| residual.abs() > cutoff)
        .map(|(index, _)| index)
        .collect();
    if !outliers.is_empty() {
        debug!("Flagged {} of {} points as outliers", outliers.len(), x.len());
    }

    Ok(RegressionResult {
        slope,
        intercept,
        outliers,
    })
}

/// Gaussian density at `x`.
///
/// # Examples
///
/// ```
/// use glycocore::algorithm::statistics::normal_pdf;
///
/// let peak = normal_pdf(0.0, 0.0, 1.0).unwrap();
/// assert!((peak - 0.3989422804014327).abs() < 1e-12);
/// assert!(normal_pdf(0.0, 0.0, -1.0).is_err());
/// ```
pub fn normal_pdf(x: f64, mean: f64, std_dev: f64) -> Result<f64> {
    let normal = Normal::new(mean, std_dev).map_err(|e| GlycoError::InvalidParameter {
        name: "std_dev",
        reason: e.to_string(),
    })?;
    Ok(normal.pdf(x))
}

/// Difference matrix of order `order` with shape `(n - order) x n`.
pub fn difference_matrix(n: usize, order: usize) -> DMatrix<f64> {
    let rows = n.saturating_sub(order);
    let coefficients: Vec<f64> = (0..=order)
        .map(|k| {
            let sign = if (order - k) % 2 == 0 { 1.0 } else { -1.0 };
            sign * binomial(order as u64, k as u64)
        })
        .collect();

    let mut matrix = DMatrix::zeros(rows, n);
    for row in 0..rows {
        for (k, coefficient) in coefficients.iter().enumerate() {
            matrix[(row, row + k)] = *coefficient;
        }
    }
    matrix
}

/// smooth a signal with the Whittaker-Eilers smoother
///
/// Solves `(I + lambda * D'D) z = y` where `D` is the difference matrix of
/// the given order.
///
/// Arguments:
///
/// * `y` - signal to smooth
/// * `lambda` - smoothness penalty, 0 returns the signal unchanged
/// * `order` - order of the penalized differences
///
/// Returns:
///
/// * `Vec<f64>` - smoothed signal
///
pub fn whittaker_smooth(y: &[f64], lambda: f64, order: usize) -> Result<Vec<f64>> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(GlycoError::InvalidParameter {
            name: "lambda",
            reason: format!("{lambda} is not a non-negative penalty"),
        });
    }
    if y.is_empty() {
        return Ok(Vec::new());
    }

    let n = y.len();
    let d = difference_matrix(n, order);
    let system = DMatrix::<f64>::identity(n, n) + (d.transpose() * &d) * lambda;
    let cholesky = system.cholesky().ok_or(GlycoError::DegenerateFit)?;
    let smoothed = cholesky.solve(&DVector::from_column_slice(y));

    Ok(smoothed.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(
            robust_linear_fit(&[], &[], DEFAULT_OUTLIER_THRESHOLD).unwrap(),
            RegressionResult::default()
        );
        assert_eq!(
            robust_linear_fit(&[1.0, 2.0], &[1.0], DEFAULT_OUTLIER_THRESHOLD),
            Err(GlycoError::Shape { left: 2, right: 1 })
        );
        assert_eq!(
            robust_linear_fit(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0], DEFAULT_OUTLIER_THRESHOLD),
            Err(GlycoError::DegenerateFit)
        );
    }

    #[test]
    fn test_flags_outlier() {
        let x: Vec<f64> = (0..=20).map(|i| i as f64).collect();
        let mut y: Vec<f64> = x.iter().map(|xi| 2.0 * xi + 1.0).collect();
        y[10] = 200.0;

        let fit = robust_linear_fit(&x, &y, DEFAULT_OUTLIER_THRESHOLD).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - (1.0 + 179.0 / 21.0)).abs() < 1e-9);
        assert_eq!(fit.outliers, vec![10]);
    }

    #[test]
    fn test_high_leverage_point_is_absorbed() {
        // the far point pulls the line towards itself and keeps a small residual
        let fit = robust_linear_fit(
            &[1.0, 2.0, 3.0, 4.0, 100.0],
            &[1.0, 2.0, 3.0, 4.0, 1000.0],
            DEFAULT_OUTLIER_THRESHOLD,
        )
        .unwrap();
        assert!(fit.outliers.is_empty());
        assert!(fit.slope > 10.0);
    }

    #[test]
    fn test_perfect_line_has_no_outliers() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let fit = robust_linear_fit(&x, &y, DEFAULT_OUTLIER_THRESHOLD).unwrap();
        assert!(fit.outliers.is_empty());
        assert!((fit.predict(5.0) - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_difference_matrix() {
        let d2 = difference_matrix(5, 2);
        assert_eq!(d2.shape(), (3, 5));
        assert_eq!(d2.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, -2.0, 1.0, 0.0, 0.0]);
        assert_eq!(d2.row(2).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 1.0, -2.0, 1.0]);
        assert_eq!(difference_matrix(2, 3).nrows(), 0);
    }

    #[test]
    fn test_whittaker_keeps_lines_and_sums() {
        let line: Vec<f64> = (0..10).map(|i| 0.5 * i as f64 + 2.0).collect();
        let smoothed = whittaker_smooth(&line, 100.0, 2).unwrap();
        for (a, b) in smoothed.iter().zip(&line) {
            assert!((a - b).abs() < 1e-8);
        }

        let zigzag: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let smoothed = whittaker_smooth(&zigzag, 10.0, 1).unwrap();
        let sum: f64 = smoothed.iter().sum();
        assert!(sum.abs() < 1e-9);
        assert!(smoothed.iter().all(|v| v.abs() < 0.5));

        assert_eq!(whittaker_smooth(&zigzag, 0.0, 2).unwrap(), zigzag);
        assert!(whittaker_smooth(&zigzag, -1.0, 2).is_err());
    }
}
