//! Parameter grid generation.
//!
//! Every free parameter gets an explicit, ordered list of candidate values. The
//! search space is the Cartesian product of those lists (see `ParameterGrid`).
//!
//! Why a grid rather than an optimizer?
//! - It cannot get stuck in a local minimum inside the searched range.
//! - It is deterministic given the same inputs.
//! - With one or two free parameters a modest grid is cheap.

use std::f64::consts::TAU;

use crate::domain::{ModelKind, ObservationSet, ParamAxis, ParameterGrid};
use crate::error::FitError;

/// Upper bound on points per axis, to catch runaway `start:stop:step` specs.
const MAX_AXIS_LEN: usize = 1_000_000;

/// Inclusive arithmetic sequence `start, start+step, ...` up to `stop`.
///
/// The endpoint is included when it lies on the sequence up to floating-point
/// noise. `step` may be negative for descending sequences.
pub fn seq(start: f64, stop: f64, step: f64) -> Result<Vec<f64>, FitError> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
        return Err(FitError::invalid(format!(
            "Invalid sequence: start={start}, stop={stop}, step={step} (must be finite)."
        )));
    }
    if step == 0.0 {
        return Err(FitError::invalid("Sequence step must be non-zero."));
    }
    let span = (stop - start) / step;
    if span < 0.0 {
        return Err(FitError::invalid(format!(
            "Sequence step {step} points away from stop ({start} -> {stop})."
        )));
    }

    // Bound the span before casting so huge ranges cannot overflow the count.
    if span + 1e-9 >= MAX_AXIS_LEN as f64 {
        return Err(FitError::invalid(format!(
            "Sequence {start}:{stop}:{step} has more than {MAX_AXIS_LEN} points."
        )));
    }
    let count = (span + 1e-9).floor() as usize + 1;

    Ok((0..count).map(|i| start + step * i as f64).collect())
}

/// `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn linspace(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, FitError> {
    if !(min.is_finite() && max.is_finite() && max >= min) {
        return Err(FitError::invalid(format!(
            "Invalid range: min={min}, max={max} (must be finite and max>=min)."
        )));
    }
    match steps {
        0 => Err(FitError::invalid("Steps must be >= 1.")),
        1 => Ok(vec![min]),
        _ => {
            let step = (max - min) / (steps as f64 - 1.0);
            let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
            out[steps - 1] = max;
            Ok(out)
        }
    }
}

/// `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, FitError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(FitError::invalid(format!(
            "Invalid log range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(FitError::invalid("Log-spaced steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

/// Parse an axis spec.
///
/// Accepted forms:
/// - `r=0:1:0.01`          start:stop:step
/// - `k=lin:50:300:101`    evenly spaced, n points
/// - `k=log:1:1000:31`     log-spaced, n points
/// - `b=0,1.57,3.14`       explicit list (a single value is fine)
pub fn parse_axis(spec: &str) -> Result<ParamAxis, FitError> {
    let (name, body) = spec
        .split_once('=')
        .ok_or_else(|| FitError::invalid(format!("Axis spec `{spec}` must look like name=values.")))?;
    let name = name.trim().to_ascii_lowercase();
    let body = body.trim();
    if name.is_empty() {
        return Err(FitError::invalid(format!("Axis spec `{spec}` has no parameter name.")));
    }

    let parts: Vec<&str> = body.split(':').map(str::trim).collect();
    let values = match parts.as_slice() {
        [mode @ ("lin" | "log"), min, max, n] => {
            let min = parse_number(min, spec)?;
            let max = parse_number(max, spec)?;
            let n: usize = n
                .parse()
                .map_err(|_| FitError::invalid(format!("Axis spec `{spec}`: `{n}` is not a count.")))?;
            if *mode == "lin" {
                linspace(min, max, n)?
            } else {
                log_space(min, max, n)?
            }
        }
        [start, stop, step] => seq(
            parse_number(start, spec)?,
            parse_number(stop, spec)?,
            parse_number(step, spec)?,
        )?,
        [list] => list
            .split(',')
            .map(|v| parse_number(v.trim(), spec))
            .collect::<Result<Vec<f64>, FitError>>()?,
        _ => {
            return Err(FitError::invalid(format!(
                "Axis spec `{spec}` is not start:stop:step, lin:min:max:n, log:min:max:n, or a list."
            )));
        }
    };

    Ok(ParamAxis::new(name, values))
}

fn parse_number(s: &str, spec: &str) -> Result<f64, FitError> {
    let v: f64 = s
        .parse()
        .map_err(|_| FitError::invalid(format!("Axis spec `{spec}`: `{s}` is not a number.")))?;
    if !v.is_finite() {
        return Err(FitError::invalid(format!("Axis spec `{spec}`: `{s}` is not finite.")));
    }
    Ok(v)
}

/// Default candidates for a parameter when the caller gives none.
pub fn default_axis(kind: ModelKind, name: &str, obs: &ObservationSet) -> Result<ParamAxis, FitError> {
    let values = match (kind, name) {
        (ModelKind::Exponential, "r") => seq(-1.0, 1.0, 0.001)?,
        (ModelKind::Sine, "b") => seq(0.0, TAU, 0.01)?,
        (ModelKind::Logistic, "r") => seq(0.01, 2.0, 0.01)?,
        (ModelKind::Logistic, "k") => {
            // Carrying capacity around the largest observed value.
            let y_max = obs.stats().y_max.abs().max(1.0);
            linspace(0.5 * y_max, 3.0 * y_max, 101)?
        }
        _ => {
            return Err(FitError::invalid(format!(
                "Model {} has no parameter `{name}`.",
                kind.display_name()
            )));
        }
    };
    Ok(ParamAxis::new(name, values))
}

/// Build the grid for `kind`, taking axes from `axes` where given and defaults otherwise.
///
/// Axes naming parameters this model does not have are ignored here; use
/// `check_axis_names` to reject names no selected model knows.
pub fn grid_for_model(
    kind: ModelKind,
    axes: &[ParamAxis],
    obs: &ObservationSet,
) -> Result<ParameterGrid, FitError> {
    let mut out = Vec::with_capacity(kind.param_count());
    for &name in kind.param_names() {
        let axis = match axes.iter().find(|a| a.name == name) {
            Some(a) => a.clone(),
            None => default_axis(kind, name, obs)?,
        };
        out.push(axis);
    }
    ParameterGrid::new(out)
}

/// Reject axes that no selected model has a parameter for.
pub fn check_axis_names(kinds: &[ModelKind], axes: &[ParamAxis]) -> Result<(), FitError> {
    for axis in axes {
        let known = kinds
            .iter()
            .any(|k| k.param_names().contains(&axis.name.as_str()));
        if !known {
            let names: Vec<String> = kinds
                .iter()
                .map(|k| format!("{}: {}", k.display_name(), k.param_names().join(", ")))
                .collect();
            return Err(FitError::invalid(format!(
                "Unknown parameter axis `{}` (free parameters are {}).",
                axis.name,
                names.join("; ")
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_includes_endpoint_despite_rounding() {
        let v = seq(0.1, 0.3, 0.05).unwrap();
        assert_eq!(v.len(), 5);
        assert!((v[4] - 0.3).abs() < 1e-12);
        assert!((v[2] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn seq_descending_and_invalid() {
        assert_eq!(seq(1.0, 0.0, -0.5).unwrap(), vec![1.0, 0.5, 0.0]);
        assert!(seq(0.0, 1.0, 0.0).is_err());
        assert!(seq(0.0, 1.0, -0.1).is_err());
        assert!(seq(0.0, 1.0, 1e-9).is_err());
    }

    #[test]
    fn seq_rejects_huge_spans_without_overflow() {
        let err = seq(0.0, 1e300, 1.0).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
        let err = parse_axis("r=0:1e30:1e-3").unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
        assert_eq!(seq(0.0, 999_999.0, 1.0).unwrap().len(), 1_000_000);
    }

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.1, 10.0, 5).unwrap();
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert!((v[v.len() - 1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn linspace_single_point() {
        assert_eq!(linspace(2.0, 2.0, 1).unwrap(), vec![2.0]);
        assert_eq!(linspace(0.0, 1.0, 3).unwrap(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn parses_all_axis_forms() {
        let a = parse_axis("r=0:1:0.25").unwrap();
        assert_eq!(a.name, "r");
        assert_eq!(a.values, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let a = parse_axis("K=lin:100:200:3").unwrap();
        assert_eq!(a.name, "k");
        assert_eq!(a.values, vec![100.0, 150.0, 200.0]);

        let a = parse_axis("k=log:1:100:3").unwrap();
        assert!((a.values[1] - 10.0).abs() < 1e-9);

        let a = parse_axis("b = 0, 1.5 ,3").unwrap();
        assert_eq!(a.values, vec![0.0, 1.5, 3.0]);
    }

    #[test]
    fn rejects_malformed_axis_specs() {
        for bad in ["r", "=1,2", "r=1:2", "r=a,b", "r=0:1:0", "r=lin:0:1:x", "r=inf"] {
            assert!(parse_axis(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn grid_for_model_uses_given_axes_and_defaults() {
        let obs = ObservationSet::from_pairs(&[(0.0, 10.0), (1.0, 40.0)]).unwrap();
        let given = vec![ParamAxis::new("r", vec![0.5, 1.0])];
        let grid = grid_for_model(ModelKind::Logistic, &given, &obs).unwrap();
        assert_eq!(grid.names(), vec!["r".to_string(), "k".to_string()]);
        assert_eq!(grid.axes()[0].values, vec![0.5, 1.0]);
        assert_eq!(grid.axes()[1].values.len(), 101);
        assert_eq!(grid.axes()[1].values[0], 20.0);
    }

    #[test]
    fn unknown_axis_names_are_rejected() {
        let axes = vec![ParamAxis::new("k", vec![1.0])];
        assert!(check_axis_names(&[ModelKind::Logistic], &axes).is_ok());
        let err = check_axis_names(&[ModelKind::Exponential, ModelKind::Sine], &axes).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }
}
