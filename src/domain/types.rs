//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during the grid search
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::math::Integrator;

/// A single `(independent, dependent)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
}

/// Ordered, immutable observation set.
///
/// Order is significant: model predictions are aligned with it index-by-index.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    points: Vec<Observation>,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl ObservationSet {
    pub fn new(points: Vec<Observation>) -> Result<Self, FitError> {
        if points.is_empty() {
            return Err(FitError::invalid("Observation set is empty."));
        }
        if let Some((i, _)) = points
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(FitError::invalid(format!(
                "Observation {i} has a non-finite value."
            )));
        }
        let xs = points.iter().map(|p| p.x).collect();
        let ys = points.iter().map(|p| p.y).collect();
        Ok(Self { points, xs, ys })
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, FitError> {
        Self::new(pairs.iter().map(|&(x, y)| Observation { x, y }).collect())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// First observation in set order (used to anchor initial conditions).
    pub fn first(&self) -> Observation {
        self.points[0]
    }

    pub fn stats(&self) -> DatasetStats {
        let fold = |values: &[f64]| {
            values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        };
        let (x_min, x_max) = fold(&self.xs);
        let (y_min, y_max) = fold(&self.ys);
        DatasetStats {
            n_points: self.len(),
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }
}

/// Summary stats about the observations actually used for fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub n_points: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Candidate values for one free parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamAxis {
    pub name: String,
    pub values: Vec<f64>,
}

impl ParamAxis {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Cartesian product of parameter axes.
///
/// Grid points are indexed lexicographically with the first axis outermost,
/// i.e. the last axis varies fastest. "Lowest index" in tie-breaking refers to
/// this order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    axes: Vec<ParamAxis>,
    len: usize,
}

impl ParameterGrid {
    pub fn new(axes: Vec<ParamAxis>) -> Result<Self, FitError> {
        if axes.is_empty() {
            return Err(FitError::invalid("Parameter grid has no axes."));
        }

        let mut seen = HashSet::new();
        let mut len = 1usize;
        for axis in &axes {
            if axis.name.trim().is_empty() {
                return Err(FitError::invalid("Parameter axis name is empty."));
            }
            if !seen.insert(axis.name.as_str()) {
                return Err(FitError::invalid(format!(
                    "Duplicate parameter axis `{}`.",
                    axis.name
                )));
            }
            if axis.values.is_empty() {
                return Err(FitError::invalid(format!(
                    "Parameter grid is empty: axis `{}` has no candidate values.",
                    axis.name
                )));
            }
            if axis.values.iter().any(|v| !v.is_finite()) {
                return Err(FitError::invalid(format!(
                    "Axis `{}` contains a non-finite candidate value.",
                    axis.name
                )));
            }
            len = len.checked_mul(axis.values.len()).ok_or_else(|| {
                FitError::invalid("Parameter grid is too large to enumerate.")
            })?;
        }

        Ok(Self { axes, len })
    }

    /// Single-parameter grid.
    pub fn single(name: impl Into<String>, values: Vec<f64>) -> Result<Self, FitError> {
        Self::new(vec![ParamAxis::new(name, values)])
    }

    pub fn axes(&self) -> &[ParamAxis] {
        &self.axes
    }

    pub fn names(&self) -> Vec<String> {
        self.axes.iter().map(|a| a.name.clone()).collect()
    }

    pub fn dims(&self) -> usize {
        self.axes.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Parameter values at grid index `idx`.
    ///
    /// # Panics
    /// Panics if `idx >= self.len()`.
    pub fn point(&self, idx: usize) -> Vec<f64> {
        assert!(idx < self.len, "grid index {idx} out of range ({})", self.len);
        let mut out = vec![0.0; self.axes.len()];
        let mut rem = idx;
        for (slot, axis) in out.iter_mut().zip(&self.axes).rev() {
            let n = axis.values.len();
            *slot = axis.values[rem % n];
            rem /= n;
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..self.len).map(move |i| self.point(i))
    }
}

/// One residual-table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualEntry {
    pub index: usize,
    pub params: Vec<f64>,
    /// Sum of squared residuals; non-finite means "no valid fit at this point".
    pub sse: f64,
}

/// Exactly one entry per grid point, in grid order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualTable {
    param_names: Vec<String>,
    entries: Vec<ResidualEntry>,
}

impl ResidualTable {
    pub fn new(param_names: Vec<String>, entries: Vec<ResidualEntry>) -> Self {
        Self {
            param_names,
            entries,
        }
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn entries(&self) -> &[ResidualEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finite_count(&self) -> usize {
        self.entries.iter().filter(|e| e.sse.is_finite()).count()
    }
}

/// Minimizing grid point of a residual table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestFit {
    pub index: usize,
    pub param_names: Vec<String>,
    pub params: Vec<f64>,
    pub sse: f64,
}

impl BestFit {
    /// Value of a named parameter, if it was part of the grid.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.param_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.params[i])
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub bic: f64,
    pub n: usize,
    pub k: usize,
}

/// Concrete forward-model kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Exponential,
    Sine,
    Logistic,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Exponential, ModelKind::Sine, ModelKind::Logistic];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Exponential => "exponential",
            ModelKind::Sine => "sine",
            ModelKind::Logistic => "logistic (ODE)",
        }
    }

    /// Free parameters, in grid-axis order.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Exponential => &["r"],
            ModelKind::Sine => &["b"],
            ModelKind::Logistic => &["r", "k"],
        }
    }

    pub fn param_count(self) -> usize {
        self.param_names().len()
    }
}

/// Which model(s) to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSpec {
    Exponential,
    Sine,
    Logistic,
    All,
}

impl ModelSpec {
    pub fn kinds(self) -> Vec<ModelKind> {
        match self {
            ModelSpec::Exponential => vec![ModelKind::Exponential],
            ModelSpec::Sine => vec![ModelKind::Sine],
            ModelSpec::Logistic => vec![ModelKind::Logistic],
            ModelSpec::All => ModelKind::ALL.to_vec(),
        }
    }
}

/// Fixed (non-searched) settings of a forward model.
///
/// Together with the best-fit parameters this fully determines a fitted curve,
/// which is what gets written to fit JSON files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum ModelSettings {
    Exponential {
        n0: f64,
        t0: f64,
    },
    Sine {
        amplitude: f64,
        period: f64,
        offset: f64,
    },
    Logistic {
        n0: f64,
        t0: f64,
        integrator: Integrator,
    },
}

impl ModelSettings {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelSettings::Exponential { .. } => ModelKind::Exponential,
            ModelSettings::Sine { .. } => ModelKind::Sine,
            ModelSettings::Logistic { .. } => ModelKind::Logistic,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data_path: PathBuf,
    pub x_col: String,
    pub y_col: String,
    pub model_spec: ModelSpec,

    /// Raw axis specs (`name=start:stop:step`, ...). Axes not given fall back to defaults.
    pub grid_specs: Vec<String>,

    /// Initial value for exponential/logistic models; `None` means "first observation".
    pub n0: Option<f64>,
    pub amplitude: f64,
    pub period: f64,
    pub offset: f64,
    pub integrator: Integrator,

    pub parallel: bool,

    pub top_n: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}

/// Configuration of a `simulate` run.
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub settings: ModelSettings,
    /// Raw `name=value` parameter specs.
    pub param_specs: Vec<String>,
    pub x_start: f64,
    pub x_stop: f64,
    pub x_step: f64,
    pub noise_sd: f64,
    pub seed: u64,
    pub x_col: String,
    pub y_col: String,
    pub out: Option<PathBuf>,
}

/// Sampled fitted curve for plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// A saved fit (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub settings: ModelSettings,
    pub best: BestFit,
    pub quality: FitQuality,
    pub grid_points: usize,
    pub observations: Vec<Observation>,
    pub curve: CurveGrid,
}
