//! Grid evaluation: score every candidate parameter tuple.
//!
//! Given:
//! - an observation set `(x_i, y_i)`
//! - a forward model
//! - a parameter grid
//!
//! we predict `y` at every `x_i` for each grid point and record
//! `SSE = Σ (predicted_i - y_i)^2` in a residual table with one entry per
//! grid point, in grid order.

use rayon::prelude::*;

use crate::domain::{ObservationSet, ParameterGrid, ResidualEntry, ResidualTable};
use crate::error::FitError;
use crate::math::sum_squared_residuals;
use crate::models::ForwardModel;

/// Evaluation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// Evaluate grid points on the rayon pool.
    pub parallel: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Score every grid point with `score`.
///
/// Grid points are independent, so evaluation order does not affect the
/// result: the table is always in grid order. Any `Err` from `score` aborts
/// the whole search.
pub fn grid_search<F>(grid: &ParameterGrid, score: F, opts: EvalOptions) -> Result<ResidualTable, FitError>
where
    F: Fn(&[f64]) -> Result<f64, FitError> + Sync,
{
    if grid.is_empty() {
        return Err(FitError::invalid("Parameter grid is empty."));
    }

    let eval = |idx: usize| -> Result<ResidualEntry, FitError> {
        let params = grid.point(idx);
        let sse = score(&params)?;
        Ok(ResidualEntry {
            index: idx,
            params,
            sse,
        })
    };

    let entries: Vec<ResidualEntry> = if opts.parallel {
        (0..grid.len()).into_par_iter().map(eval).collect::<Result<Vec<_>, FitError>>()?
    } else {
        (0..grid.len()).map(eval).collect::<Result<Vec<_>, FitError>>()?
    };

    Ok(ResidualTable::new(grid.names(), entries))
}

/// Summed squared residuals of `model` against `obs` at every grid point.
///
/// ODE integration failure at a grid point is recorded as `+∞` and the search
/// continues; every other error aborts.
pub fn evaluate_grid<M>(
    model: &M,
    obs: &ObservationSet,
    grid: &ParameterGrid,
    opts: EvalOptions,
) -> Result<ResidualTable, FitError>
where
    M: ForwardModel + ?Sized,
{
    if grid.dims() != model.param_names().len() {
        return Err(FitError::DimensionMismatch {
            expected: model.param_names().len(),
            actual: grid.dims(),
        });
    }

    let xs = obs.xs();
    let ys = obs.ys();

    let table = grid_search(
        grid,
        |params| match model.predict(params, xs) {
            Ok(predicted) => sum_squared_residuals(&predicted, ys),
            Err(FitError::Integration(reason)) => {
                tracing::trace!(?params, %reason, "integration failed; scoring as +inf");
                Ok(f64::INFINITY)
            }
            Err(e) => Err(e),
        },
        opts,
    )?;

    let failed = table.len() - table.finite_count();
    if failed > 0 {
        tracing::warn!(
            model = model.kind().display_name(),
            failed,
            total = table.len(),
            "grid points without a finite residual sum"
        );
    }
    tracing::debug!(
        model = model.kind().display_name(),
        points = table.len(),
        parallel = opts.parallel,
        "grid evaluated"
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelKind, ModelSettings, ParamAxis};
    use crate::math::Integrator;
    use crate::models::{Exponential, Logistic};

    /// Returns a fixed-length prediction regardless of input, to exercise length checks.
    struct WrongLength;

    impl ForwardModel for WrongLength {
        fn kind(&self) -> ModelKind {
            ModelKind::Exponential
        }

        fn settings(&self) -> ModelSettings {
            ModelSettings::Exponential { n0: 0.0, t0: 0.0 }
        }

        fn predict(&self, _params: &[f64], _xs: &[f64]) -> Result<Vec<f64>, FitError> {
            Ok(vec![0.0])
        }
    }

    fn growth_obs() -> ObservationSet {
        ObservationSet::from_pairs(&[(0.0, 10.0), (1.0, 12.21), (2.0, 14.92)]).unwrap()
    }

    #[test]
    fn one_entry_per_grid_point_in_order() {
        let grid = ParameterGrid::single("r", vec![0.1, 0.15, 0.2, 0.25, 0.3]).unwrap();
        let table = evaluate_grid(&Exponential::new(10.0, 0.0), &growth_obs(), &grid, EvalOptions::default())
            .unwrap();
        assert_eq!(table.len(), grid.len());
        for (i, e) in table.entries().iter().enumerate() {
            assert_eq!(e.index, i);
            assert_eq!(e.params, grid.point(i));
            assert!(e.sse >= 0.0);
        }
    }

    #[test]
    fn serial_and_parallel_agree() {
        let grid = ParameterGrid::single("r", (0..200).map(|i| -1.0 + i as f64 * 0.01).collect()).unwrap();
        let model = Exponential::new(10.0, 0.0);
        let a = evaluate_grid(&model, &growth_obs(), &grid, EvalOptions { parallel: false }).unwrap();
        let b = evaluate_grid(&model, &growth_obs(), &grid, EvalOptions { parallel: true }).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn length_mismatch_aborts_search() {
        let grid = ParameterGrid::single("r", vec![0.1, 0.2]).unwrap();
        let err = evaluate_grid(&WrongLength, &growth_obs(), &grid, EvalOptions::default()).unwrap_err();
        assert_eq!(
            err,
            FitError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn grid_dimension_must_match_model() {
        let grid = ParameterGrid::new(vec![
            ParamAxis::new("r", vec![0.1]),
            ParamAxis::new("k", vec![1.0]),
        ])
        .unwrap();
        let err = evaluate_grid(&Exponential::new(10.0, 0.0), &growth_obs(), &grid, EvalOptions::default())
            .unwrap_err();
        assert!(matches!(err, FitError::DimensionMismatch { .. }));
    }

    #[test]
    fn integration_failure_scores_infinity_and_search_continues() {
        let obs = ObservationSet::from_pairs(&[(0.0, 10.0), (2.0, 50.0), (4.0, 90.0)]).unwrap();
        let grid = ParameterGrid::new(vec![
            ParamAxis::new("r", vec![1.0]),
            ParamAxis::new("k", vec![-10.0, 100.0]),
        ])
        .unwrap();
        let model = Logistic::new(10.0, 0.0, Integrator::default());
        let table = evaluate_grid(&model, &obs, &grid, EvalOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].sse, f64::INFINITY);
        assert!(table.entries()[1].sse.is_finite());
        assert_eq!(table.finite_count(), 1);
    }

    #[test]
    fn generic_search_propagates_score_errors() {
        let grid = ParameterGrid::single("x", vec![1.0, 2.0, 3.0]).unwrap();
        let err = grid_search(
            &grid,
            |p| {
                if p[0] == 2.0 {
                    Err(FitError::invalid("boom"))
                } else {
                    Ok(p[0])
                }
            },
            EvalOptions { parallel: false },
        )
        .unwrap_err();
        assert_eq!(err, FitError::invalid("boom"));
    }
}
