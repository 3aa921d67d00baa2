//! Synthetic observation generation from a known model.
//!
//! Useful for checking that a grid recovers known parameters, and for producing
//! demo datasets: evaluate the model at the requested x-values, then add
//! independent Gaussian noise with standard deviation `noise_sd`.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Observation, ObservationSet};
use crate::error::FitError;
use crate::models::ForwardModel;

/// Generate observations `y_i = model(params, x_i) + ε_i`, `ε_i ~ N(0, noise_sd²)`.
///
/// Output is deterministic for a given `seed`. With `noise_sd == 0` the
/// observations are exactly the model predictions.
pub fn simulate(
    model: &dyn ForwardModel,
    params: &[f64],
    xs: &[f64],
    noise_sd: f64,
    seed: u64,
) -> Result<ObservationSet, FitError> {
    if !(noise_sd.is_finite() && noise_sd >= 0.0) {
        return Err(FitError::invalid(format!(
            "Noise standard deviation must be finite and >= 0, got {noise_sd}."
        )));
    }

    let predicted = model.predict(params, xs)?;
    if predicted.len() != xs.len() {
        return Err(FitError::DimensionMismatch {
            expected: xs.len(),
            actual: predicted.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise_sd).map_err(|e| FitError::invalid(format!("Noise distribution error: {e}")))?;

    let points = xs
        .iter()
        .zip(predicted)
        .map(|(&x, y)| {
            let noise = if noise_sd > 0.0 { normal.sample(&mut rng) } else { 0.0 };
            Observation { x, y: y + noise }
        })
        .collect();

    ObservationSet::new(points)
}
