//! Least-squares scoring.
//!
//! The grid search scores each candidate parameter tuple by
//!
//! ```text
//! SSE = Σ (predicted_i - observed_i)^2
//! ```
//!
//! Predictions and observations are aligned by index; a length mismatch is an
//! error rather than a silent truncation.

use nalgebra::DVector;

use crate::error::FitError;

/// Elementwise residuals `predicted - observed`.
pub fn residuals(predicted: &[f64], observed: &[f64]) -> Result<DVector<f64>, FitError> {
    if predicted.len() != observed.len() {
        return Err(FitError::DimensionMismatch {
            expected: observed.len(),
            actual: predicted.len(),
        });
    }
    Ok(DVector::from_column_slice(predicted) - DVector::from_column_slice(observed))
}

/// Sum of squared residuals.
///
/// Non-finite predictions produce a non-finite sum; callers treat that as
/// "worse than any real fit".
pub fn sum_squared_residuals(predicted: &[f64], observed: &[f64]) -> Result<f64, FitError> {
    Ok(residuals(predicted, observed)?.norm_squared())
}

/// Root-mean-square residual for `n` observations.
pub fn rmse(sse: f64, n: usize) -> f64 {
    if n == 0 {
        return f64::NAN;
    }
    (sse / n as f64).sqrt()
}

/// Bayesian information criterion for a Gaussian least-squares fit.
///
/// `BIC = n * ln(SSE/n) + k * ln(n)`; SSE is floored so a perfect fit stays finite.
pub fn bic(n: usize, sse: f64, k: usize) -> f64 {
    let n_f = n as f64;
    let sse_per = (sse / n_f).max(1e-12);
    n_f * sse_per.ln() + (k as f64) * n_f.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_of_simple_residuals() {
        let sse = sum_squared_residuals(&[1.0, 2.0, 4.0], &[1.0, 3.0, 2.0]).unwrap();
        assert!((sse - 5.0).abs() < 1e-12);
    }

    #[test]
    fn sse_is_zero_for_identical_sequences() {
        let y = [0.3, -1.5, 7.25];
        assert_eq!(sum_squared_residuals(&y, &y).unwrap(), 0.0);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = sum_squared_residuals(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            FitError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn non_finite_prediction_gives_non_finite_sse() {
        let sse = sum_squared_residuals(&[f64::INFINITY, 1.0], &[0.0, 1.0]).unwrap();
        assert!(!sse.is_finite());
    }

    #[test]
    fn bic_penalizes_extra_parameters() {
        assert!(bic(20, 4.0, 2) > bic(20, 4.0, 1));
        assert!(bic(20, 0.0, 1).is_finite());
    }
}
