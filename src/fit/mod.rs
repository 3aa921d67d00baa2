//! Least-squares grid search orchestration.
//!
//! Responsibilities:
//!
//! - build parameter grids (`grid`)
//! - evaluate every grid point for a forward model (`evaluator`, parallel)
//! - select the best grid point, and the best model across models (`selection`)

pub mod evaluator;
pub mod grid;
pub mod selection;

pub use evaluator::*;
pub use grid::*;
pub use selection::*;

use crate::domain::{BestFit, FitQuality, ModelKind, ModelSettings, ObservationSet, ParameterGrid, ResidualTable};
use crate::error::FitError;
use crate::math::{bic, rmse};
use crate::models::ForwardModel;

/// Best fit of a single model over its grid.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub settings: ModelSettings,
    pub best: BestFit,
    pub quality: FitQuality,
    pub table: ResidualTable,
}

impl ModelFit {
    pub fn kind(&self) -> ModelKind {
        self.settings.kind()
    }
}

/// Evaluate `model` over `grid` and select the minimizing grid point.
pub fn fit_model<M>(
    model: &M,
    obs: &ObservationSet,
    grid: &ParameterGrid,
    opts: EvalOptions,
) -> Result<ModelFit, FitError>
where
    M: ForwardModel + ?Sized,
{
    let table = evaluate_grid(model, obs, grid, opts)?;
    let best = select_best(&table)?;

    let n = obs.len();
    let k = model.param_names().len();
    let quality = FitQuality {
        sse: best.sse,
        rmse: rmse(best.sse, n),
        bic: bic(n, best.sse, k),
        n,
        k,
    };

    tracing::info!(
        model = model.kind().display_name(),
        params = ?best.params,
        sse = best.sse,
        "best grid point"
    );

    Ok(ModelFit {
        settings: model.settings(),
        best,
        quality,
        table,
    })
}

/// Output of fitting several models to the same observations.
#[derive(Debug, Clone)]
pub struct FitSelection {
    /// Index into `fits` of the chosen model.
    pub best: usize,
    pub fits: Vec<ModelFit>,
    /// Models that were not fitted and why (for diagnostics).
    pub skipped: Vec<(ModelKind, String)>,
}

impl FitSelection {
    pub fn best_fit(&self) -> &ModelFit {
        &self.fits[self.best]
    }
}

/// Fit every `(model, grid)` plan and choose among them.
///
/// With a single plan, that plan's fit is the result and every error
/// propagates. With several, models that have no degrees of freedom left or
/// that find no finite fit are skipped, and the rest are compared by BIC.
pub fn fit_and_select(
    obs: &ObservationSet,
    plans: &[(Box<dyn ForwardModel>, ParameterGrid)],
    opts: EvalOptions,
) -> Result<FitSelection, FitError> {
    if plans.is_empty() {
        return Err(FitError::invalid("No models to fit."));
    }

    if let [(model, grid)] = plans {
        let fit = fit_model(model.as_ref(), obs, grid, opts)?;
        return Ok(FitSelection {
            best: 0,
            fits: vec![fit],
            skipped: Vec::new(),
        });
    }

    let n = obs.len();
    let mut fits = Vec::new();
    let mut skipped = Vec::new();

    for (model, grid) in plans {
        let kind = model.kind();
        let k = kind.param_count();
        if n <= k {
            skipped.push((kind, format!("Underdetermined: n={n} <= k={k}")));
            continue;
        }
        match fit_model(model.as_ref(), obs, grid, opts) {
            Ok(fit) => fits.push(fit),
            Err(e @ FitError::NoValidFit { .. }) => {
                tracing::warn!(model = kind.display_name(), "skipping: {e}");
                skipped.push((kind, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    let best = select_by_bic(&fits).ok_or(FitError::NoValidFit {
        grid_points: plans.iter().map(|(_, g)| g.len()).sum(),
    })?;

    Ok(FitSelection { best, fits, skipped })
}
