//! Exponential growth: `N(t) = N0 · exp(r · (t - t0))`.
//!
//! Free parameter: `r`. `N0` and `t0` are fixed, by default to the first
//! observation, so the curve passes through it for every `r`.

use crate::domain::{ModelKind, ModelSettings, ObservationSet};
use crate::error::FitError;
use crate::models::model::{check_param_count, ForwardModel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exponential {
    pub n0: f64,
    pub t0: f64,
}

impl Exponential {
    pub fn new(n0: f64, t0: f64) -> Self {
        Self { n0, t0 }
    }

    /// Anchor at the first observation; `n0` overrides its y-value if given.
    pub fn from_observations(obs: &ObservationSet, n0: Option<f64>) -> Self {
        let first = obs.first();
        Self::new(n0.unwrap_or(first.y), first.x)
    }
}

impl ForwardModel for Exponential {
    fn kind(&self) -> ModelKind {
        ModelKind::Exponential
    }

    fn settings(&self) -> ModelSettings {
        ModelSettings::Exponential {
            n0: self.n0,
            t0: self.t0,
        }
    }

    fn predict(&self, params: &[f64], xs: &[f64]) -> Result<Vec<f64>, FitError> {
        check_param_count(self.kind(), params)?;
        let r = params[0];
        Ok(xs.iter().map(|&t| self.n0 * (r * (t - self.t0)).exp()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicts_growth_from_anchor() {
        let model = Exponential::new(10.0, 0.0);
        let ys = model.predict(&[0.2], &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(ys[0], 10.0);
        assert!((ys[1] - 12.214027581601698).abs() < 1e-12);
        assert!((ys[2] - 14.918246976412703).abs() < 1e-12);
    }

    #[test]
    fn negative_rate_decays_without_error() {
        let model = Exponential::new(8.0, 1.0);
        let ys = model.predict(&[-50.0], &[1.0, 100.0]).unwrap();
        assert_eq!(ys[0], 8.0);
        assert!(ys[1] >= 0.0 && ys[1] < 1e-100);
    }

    #[test]
    fn anchored_on_first_observation() {
        let obs = ObservationSet::from_pairs(&[(3.0, 7.0), (4.0, 9.0)]).unwrap();
        assert_eq!(Exponential::from_observations(&obs, None), Exponential::new(7.0, 3.0));
        assert_eq!(Exponential::from_observations(&obs, Some(2.0)), Exponential::new(2.0, 3.0));
    }
}
