//! Shared pipeline logic behind the `fit` and `simulate` commands.
//!
//! Keeping this in one place keeps `app` about presentation only:
//! CSV ingest -> axis parsing -> per-model grids -> search -> selection -> residuals

use std::collections::HashSet;

use crate::data::simulate;
use crate::domain::{FitConfig, ModelKind, ModelSettings, ObservationSet, ParamAxis, ParameterGrid, SimulateConfig};
use crate::error::{AppError, FitError};
use crate::fit::{check_axis_names, fit_and_select, grid_for_model, parse_axis, seq, EvalOptions, FitSelection};
use crate::io::{load_observations, IngestedData};
use crate::models::{build_model, Exponential, ForwardModel, Logistic, Sine};
use crate::report::{compute_residuals, FittedPoint};

/// All computed outputs of a single `gridfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub selection: FitSelection,
    pub residuals: Vec<FittedPoint>,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = load_observations(&config.data_path, &config.x_col, &config.y_col)?;
    tracing::info!(
        path = %config.data_path.display(),
        points = ingest.rows_used,
        "observations loaded"
    );

    let selection = fit_observations(&ingest.observations, config)?;
    let residuals = compute_residuals(&ingest.observations, selection.best_fit())?;

    Ok(RunOutput {
        ingest,
        selection,
        residuals,
    })
}

/// Build per-model grids from `config` and run the search on `obs`.
pub fn fit_observations(obs: &ObservationSet, config: &FitConfig) -> Result<FitSelection, FitError> {
    config
        .integrator
        .validate()
        .map_err(|e| FitError::invalid(e.to_string()))?;

    let axes = parse_axes(&config.grid_specs)?;
    let kinds = config.model_spec.kinds();
    check_axis_names(&kinds, &axes)?;

    let mut plans: Vec<(Box<dyn ForwardModel>, ParameterGrid)> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let model = model_for_observations(kind, config, obs);
        let grid = grid_for_model(kind, &axes, obs)?;
        tracing::debug!(
            model = kind.display_name(),
            points = grid.len(),
            dims = grid.dims(),
            "grid built"
        );
        plans.push((model, grid));
    }

    fit_and_select(obs, &plans, EvalOptions { parallel: config.parallel })
}

fn parse_axes(specs: &[String]) -> Result<Vec<ParamAxis>, FitError> {
    let axes = specs
        .iter()
        .map(|s| parse_axis(s))
        .collect::<Result<Vec<_>, FitError>>()?;

    let mut seen = HashSet::new();
    for axis in &axes {
        if !seen.insert(axis.name.as_str()) {
            return Err(FitError::invalid(format!("Axis `{}` given more than once.", axis.name)));
        }
    }
    Ok(axes)
}

fn model_for_observations(kind: ModelKind, config: &FitConfig, obs: &ObservationSet) -> Box<dyn ForwardModel> {
    match kind {
        ModelKind::Exponential => Box::new(Exponential::from_observations(obs, config.n0)),
        ModelKind::Sine => Box::new(Sine::new(config.amplitude, config.period, config.offset)),
        ModelKind::Logistic => Box::new(Logistic::from_observations(obs, config.n0, config.integrator)),
    }
}

/// Generate a synthetic observation set as described by `config`.
pub fn run_simulate(config: &SimulateConfig) -> Result<ObservationSet, FitError> {
    if let ModelSettings::Logistic { integrator, .. } = &config.settings {
        integrator
            .validate()
            .map_err(|e| FitError::invalid(e.to_string()))?;
    }

    let kind = config.settings.kind();
    let params = parse_params(kind, &config.param_specs)?;
    let xs = seq(config.x_start, config.x_stop, config.x_step)?;
    let model = build_model(&config.settings);

    tracing::info!(model = kind.display_name(), ?params, points = xs.len(), "simulating");
    simulate(model.as_ref(), &params, &xs, config.noise_sd, config.seed)
}

/// Parse `name=value` specs into a parameter vector in `kind`'s order.
///
/// Every free parameter must be given exactly once.
pub fn parse_params(kind: ModelKind, specs: &[String]) -> Result<Vec<f64>, FitError> {
    let names = kind.param_names();
    let mut values: Vec<Option<f64>> = vec![None; names.len()];

    for spec in specs {
        let (name, raw) = spec
            .split_once('=')
            .ok_or_else(|| FitError::invalid(format!("Parameter `{spec}` must look like name=value.")))?;
        let name = name.trim().to_ascii_lowercase();
        let pos = names.iter().position(|n| *n == name).ok_or_else(|| {
            FitError::invalid(format!(
                "Model {} has no parameter `{name}` (expected {}).",
                kind.display_name(),
                names.join(", ")
            ))
        })?;
        let v: f64 = raw
            .trim()
            .parse()
            .map_err(|_| FitError::invalid(format!("Parameter `{spec}`: `{}` is not a number.", raw.trim())))?;
        if !v.is_finite() {
            return Err(FitError::invalid(format!("Parameter `{spec}` is not finite.")));
        }
        if values[pos].replace(v).is_some() {
            return Err(FitError::invalid(format!("Parameter `{name}` given more than once.")));
        }
    }

    names
        .iter()
        .zip(values)
        .map(|(name, v)| v.ok_or_else(|| FitError::invalid(format!("Missing parameter `{name}`."))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelSpec;
    use crate::math::Integrator;

    fn config(model_spec: ModelSpec, grid_specs: &[&str]) -> FitConfig {
        FitConfig {
            data_path: "unused.csv".into(),
            x_col: "t".to_string(),
            y_col: "n".to_string(),
            model_spec,
            grid_specs: grid_specs.iter().map(|s| s.to_string()).collect(),
            n0: None,
            amplitude: 1.0,
            period: 365.0,
            offset: 0.0,
            integrator: Integrator::default(),
            parallel: true,
            top_n: 5,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_fit: None,
        }
    }

    fn simulate_config(settings: ModelSettings, params: &[&str], noise_sd: f64) -> SimulateConfig {
        SimulateConfig {
            settings,
            param_specs: params.iter().map(|s| s.to_string()).collect(),
            x_start: 0.0,
            x_stop: 10.0,
            x_step: 1.0,
            noise_sd,
            seed: 7,
            x_col: "t".to_string(),
            y_col: "n".to_string(),
            out: None,
        }
    }

    #[test]
    fn exponential_scenario_through_config() {
        let obs = ObservationSet::from_pairs(&[(0.0, 10.0), (1.0, 12.21), (2.0, 14.92)]).unwrap();
        let selection = fit_observations(&obs, &config(ModelSpec::Exponential, &["r=0.1,0.15,0.2,0.25,0.3"])).unwrap();
        assert_eq!(selection.best_fit().best.params, vec![0.2]);
    }

    #[test]
    fn simulated_logistic_is_recovered() {
        let settings = ModelSettings::Logistic {
            n0: 10.0,
            t0: 0.0,
            integrator: Integrator::default(),
        };
        let obs = run_simulate(&simulate_config(settings, &["r=1", "K=150"], 0.0)).unwrap();
        assert_eq!(obs.len(), 11);

        let selection = fit_observations(&obs, &config(ModelSpec::Logistic, &["r=0.5,1.0", "k=100,150"])).unwrap();
        assert_eq!(selection.best_fit().best.params, vec![1.0, 150.0]);
    }

    #[test]
    fn unknown_or_repeated_axes_are_invalid() {
        let obs = ObservationSet::from_pairs(&[(0.0, 1.0), (1.0, 2.0)]).unwrap();
        let err = fit_observations(&obs, &config(ModelSpec::Exponential, &["k=1,2"])).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
        let err = fit_observations(&obs, &config(ModelSpec::Exponential, &["r=1,2", "r=3"])).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }

    #[test]
    fn bad_integrator_settings_are_invalid_input() {
        let obs = ObservationSet::from_pairs(&[(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]).unwrap();
        let mut cfg = config(ModelSpec::Logistic, &["r=1", "k=10"]);
        cfg.integrator = Integrator::Rk4 { step: 0.0 };
        let err = fit_observations(&obs, &cfg).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }

    #[test]
    fn params_parse_in_model_order() {
        let p = parse_params(ModelKind::Logistic, &["k=150".to_string(), "r=0.5".to_string()]).unwrap();
        assert_eq!(p, vec![0.5, 150.0]);
        assert!(parse_params(ModelKind::Logistic, &["r=0.5".to_string()]).is_err());
        assert!(parse_params(ModelKind::Exponential, &["r=1".to_string(), "r=2".to_string()]).is_err());
        assert!(parse_params(ModelKind::Sine, &["r=1".to_string()]).is_err());
    }
}
