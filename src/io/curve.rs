//! Read/write fit JSON files.
//!
//! A fit JSON is the portable representation of a finished search:
//! - model kind and its fixed settings
//! - best grid point and fit quality
//! - the observations that were fitted
//! - a precomputed curve for quick plotting
//!
//! The schema is `domain::FitFile`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveGrid, FitFile, ObservationSet};
use crate::error::{AppError, FitError};
use crate::fit::ModelFit;
use crate::models::{build_model, sample_curve};

/// Points in the saved curve.
pub const CURVE_POINTS: usize = 201;

/// Assemble the fit file for `fit` against the observations it was fitted to.
pub fn build_fit_file(fit: &ModelFit, obs: &ObservationSet) -> Result<FitFile, FitError> {
    let stats = obs.stats();
    let model = build_model(&fit.settings);
    let curve = curve_grid(model.as_ref(), &fit.best.params, stats.x_min, stats.x_max)?;

    Ok(FitFile {
        tool: "gridfit".to_string(),
        generated_at: Utc::now(),
        settings: fit.settings.clone(),
        best: fit.best.clone(),
        quality: fit.quality,
        grid_points: fit.table.len(),
        observations: obs.points().to_vec(),
        curve,
    })
}

/// Sample the fitted curve over `[x_min, x_max]`, dropping non-finite points.
///
/// A degenerate range is widened so the curve still has some extent.
pub fn curve_grid(
    model: &dyn crate::models::ForwardModel,
    params: &[f64],
    x_min: f64,
    x_max: f64,
) -> Result<CurveGrid, FitError> {
    let (lo, hi) = if x_max > x_min {
        (x_min, x_max)
    } else {
        (x_min - 0.5, x_max + 0.5)
    };

    let (xs, ys) = match sample_curve(model, params, lo, hi, CURVE_POINTS) {
        Ok(v) => v,
        Err(FitError::Integration(reason)) => {
            tracing::warn!(%reason, "fitted curve could not be sampled");
            return Ok(CurveGrid { x: Vec::new(), y: Vec::new() });
        }
        Err(e) => return Err(e),
    };

    let (x, y) = xs.into_iter().zip(ys).filter(|(_, y)| y.is_finite()).unzip();
    Ok(CurveGrid { x, y })
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &FitFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    write_fit(BufWriter::new(file), fit)
}

fn write_fit<W: Write>(mut out: W, fit: &FitFile) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut out, fit)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    read_fit(BufReader::new(file))
}

fn read_fit<R: Read>(input: R) -> Result<FitFile, AppError> {
    serde_json::from_reader(input).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))
}
