//! The forward-model abstraction.
//!
//! The grid search relies on one primitive operation: given a parameter vector
//! and the observation x-values, predict y at each x. Everything else
//! (residuals, selection, plotting) is built on top of that.

use crate::domain::{ModelKind, ModelSettings};
use crate::error::FitError;
use crate::models::{Exponential, Logistic, Sine};

/// A pure function of `(params, xs) -> predicted ys`.
///
/// Implementations must:
/// - return exactly one prediction per x, in the same order
/// - never panic on out-of-range parameters (negative rates etc.); non-finite
///   predictions are allowed and are scored as "no fit"
pub trait ForwardModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Free parameter names, in the order `predict` expects them.
    fn param_names(&self) -> &'static [&'static str] {
        self.kind().param_names()
    }

    /// Fixed settings needed to rebuild this model later.
    fn settings(&self) -> ModelSettings;

    fn predict(&self, params: &[f64], xs: &[f64]) -> Result<Vec<f64>, FitError>;
}

/// Reject parameter vectors of the wrong length.
pub fn check_param_count(kind: ModelKind, params: &[f64]) -> Result<(), FitError> {
    let expected = kind.param_count();
    if params.len() != expected {
        return Err(FitError::DimensionMismatch {
            expected,
            actual: params.len(),
        });
    }
    Ok(())
}

/// Rebuild a model from saved settings.
pub fn build_model(settings: &ModelSettings) -> Box<dyn ForwardModel> {
    match *settings {
        ModelSettings::Exponential { n0, t0 } => Box::new(Exponential::new(n0, t0)),
        ModelSettings::Sine {
            amplitude,
            period,
            offset,
        } => Box::new(Sine::new(amplitude, period, offset)),
        ModelSettings::Logistic { n0, t0, integrator } => Box::new(Logistic::new(n0, t0, integrator)),
    }
}

/// Sample a fitted model on `n` evenly spaced points in `[x_min, x_max]`.
pub fn sample_curve(
    model: &dyn ForwardModel,
    params: &[f64],
    x_min: f64,
    x_max: f64,
    n: usize,
) -> Result<(Vec<f64>, Vec<f64>), FitError> {
    let n = n.max(2);
    let xs: Vec<f64> = (0..n)
        .map(|i| x_min + (x_max - x_min) * i as f64 / (n as f64 - 1.0))
        .collect();
    let ys = model.predict(params, &xs)?;
    Ok((xs, ys))
}
