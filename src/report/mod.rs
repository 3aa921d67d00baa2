//! Reporting utilities: per-observation residuals and formatted terminal output.

pub mod format;

pub use format::*;

use std::cmp::Ordering;

use crate::error::FitError;
use crate::fit::ModelFit;
use crate::domain::ObservationSet;
use crate::models::build_model;

/// One observation next to the best-fit prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedPoint {
    pub x: f64,
    pub y_obs: f64,
    pub y_fit: f64,
    /// `y_obs - y_fit`.
    pub residual: f64,
}

/// Compute fitted values and residuals at each observation.
pub fn compute_residuals(obs: &ObservationSet, fit: &ModelFit) -> Result<Vec<FittedPoint>, FitError> {
    let model = build_model(&fit.settings);
    let predicted = model.predict(&fit.best.params, obs.xs())?;
    if predicted.len() != obs.len() {
        return Err(FitError::DimensionMismatch {
            expected: obs.len(),
            actual: predicted.len(),
        });
    }

    Ok(obs
        .points()
        .iter()
        .zip(predicted)
        .map(|(p, y_fit)| FittedPoint {
            x: p.x,
            y_obs: p.y,
            y_fit,
            residual: p.y - y_fit,
        })
        .collect())
}

/// The `n` observations with the largest absolute residual, largest first.
///
/// Ties keep observation order.
pub fn largest_residuals(points: &[FittedPoint], n: usize) -> Vec<FittedPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| b.residual.abs().partial_cmp(&a.residual.abs()).unwrap_or(Ordering::Equal));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParameterGrid;
    use crate::fit::{fit_model, EvalOptions};
    use crate::models::Exponential;

    #[test]
    fn compute_residuals_basic() {
        let obs = ObservationSet::from_pairs(&[(0.0, 10.0), (1.0, 11.0), (2.0, 9.0)]).unwrap();
        let grid = ParameterGrid::single("r", vec![0.0, 0.5]).unwrap();
        let fit = fit_model(&Exponential::new(10.0, 0.0), &obs, &grid, EvalOptions::default()).unwrap();

        let residuals = compute_residuals(&obs, &fit).unwrap();
        assert_eq!(residuals.len(), 3);
        assert_eq!(residuals[0].y_fit, 10.0);
        assert_eq!(residuals[1].residual, 1.0);
        assert_eq!(residuals[2].residual, -1.0);
    }

    #[test]
    fn largest_residuals_by_magnitude() {
        let pts: Vec<FittedPoint> = [0.5, -3.0, 2.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, &r)| FittedPoint {
                x: i as f64,
                y_obs: r,
                y_fit: 0.0,
                residual: r,
            })
            .collect();
        let top = largest_residuals(&pts, 3);
        let xs: Vec<f64> = top.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 3.0, 2.0]);
    }
}
