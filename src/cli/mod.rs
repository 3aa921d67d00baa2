//! Command-line parsing for the grid-search fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! search and modeling code; `app` turns these structs into library calls.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{ModelKind, ModelSpec};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gridfit", version, about = "Brute-force least-squares grid search for forward models")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Worker threads for parallel grid evaluation (default: all cores).
    #[arg(long, env = "GRIDFIT_THREADS", global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit model(s) to a CSV by grid search; print diagnostics and optionally plot/export.
    Fit(FitArgs),
    /// Generate a synthetic observation CSV from a model with known parameters.
    Simulate(SimulateArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
}

/// ODE integrator selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntegratorKind {
    /// Fixed-step classical Runge-Kutta.
    Rk4,
    /// Adaptive Dormand-Prince 5(4).
    Dopri5,
}

/// Fixed (non-searched) model settings shared by `fit` and `simulate`.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Initial value N0 for exponential/logistic models (default: first observation's y).
    #[arg(long)]
    pub n0: Option<f64>,

    /// Sine amplitude A.
    #[arg(long, default_value_t = 1.0)]
    pub amplitude: f64,

    /// Sine period T (same units as x).
    #[arg(long, default_value_t = 365.0)]
    pub period: f64,

    /// Sine vertical offset c.
    #[arg(long, default_value_t = 0.0)]
    pub offset: f64,

    /// Integrator for the logistic ODE.
    #[arg(long, value_enum, default_value_t = IntegratorKind::Dopri5)]
    pub integrator: IntegratorKind,

    /// RK4 step size.
    #[arg(long = "ode-step", default_value_t = 0.01)]
    pub ode_step: f64,

    /// Dopri5 relative tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub rtol: f64,

    /// Dopri5 absolute tolerance.
    #[arg(long, default_value_t = 1e-10)]
    pub atol: f64,

    /// Dopri5 step budget per integration.
    #[arg(long = "max-steps", default_value_t = 100_000)]
    pub max_steps: usize,
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Input CSV with a header row.
    #[arg(long, value_name = "CSV")]
    pub data: PathBuf,

    /// Column holding the independent variable.
    #[arg(long = "x-col", default_value = "x")]
    pub x_col: String,

    /// Column holding the observed values.
    #[arg(long = "y-col", default_value = "y")]
    pub y_col: String,

    /// Which model(s) to fit. `all` compares them by BIC.
    #[arg(long, value_enum, default_value_t = ModelSpec::Exponential)]
    pub model: ModelSpec,

    /// Parameter axis, repeatable: `r=0:1:0.01`, `k=lin:50:300:101`, `k=log:1:1000:31`, `b=0,1.57`.
    /// Parameters without an axis use built-in defaults.
    #[arg(long = "grid", value_name = "AXIS")]
    pub grid: Vec<String>,

    #[command(flatten)]
    pub model_args: ModelArgs,

    /// Show the N best grid points.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Render an ASCII plot in the terminal (the default; overrides an earlier `--no-plot`).
    #[arg(long, overrides_with = "no_plot")]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long = "no-plot", overrides_with = "plot")]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the chosen model's residual table (one row per grid point) to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fit (model + settings + best point + curve) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,

    /// Evaluate grid points on a single thread.
    #[arg(long)]
    pub serial: bool,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Model to simulate.
    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// Parameter values, repeatable: `r=0.2`, `k=150`.
    #[arg(long = "params", value_name = "NAME=VALUE", required = true)]
    pub params: Vec<String>,

    #[command(flatten)]
    pub model_args: ModelArgs,

    /// First x value.
    #[arg(long = "x-start", default_value_t = 0.0)]
    pub x_start: f64,

    /// Last x value (inclusive).
    #[arg(long = "x-stop", default_value_t = 10.0)]
    pub x_stop: f64,

    /// Spacing between x values.
    #[arg(long = "x-step", default_value_t = 1.0)]
    pub x_step: f64,

    /// Standard deviation of additive Gaussian noise (0 = exact model values).
    #[arg(long = "noise-sd", default_value_t = 0.0)]
    pub noise_sd: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Header names for the output columns.
    #[arg(long = "x-col", default_value = "x")]
    pub x_col: String,

    #[arg(long = "y-col", default_value = "y")]
    pub y_col: String,

    /// Output CSV (stdout when omitted).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `gridfit fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}
