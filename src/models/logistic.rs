//! Logistic growth as an ODE: `dN/dt = r · N · (1 - N/K)`.
//!
//! Free parameters: `r`, `K`. The initial state `N(t0) = N0` is fixed and the
//! curve is obtained by numerically integrating to each observation time.

use crate::domain::{ModelKind, ModelSettings, ObservationSet};
use crate::error::FitError;
use crate::math::{integrate_to, Integrator, OdeSystem};
use crate::models::model::{check_param_count, ForwardModel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Logistic {
    pub n0: f64,
    pub t0: f64,
    pub integrator: Integrator,
}

struct LogisticRhs {
    r: f64,
    k: f64,
}

impl OdeSystem for LogisticRhs {
    fn dimension(&self) -> usize {
        1
    }

    fn rhs(&self, _t: f64, y: &[f64], out: &mut [f64]) {
        out[0] = self.r * y[0] * (1.0 - y[0] / self.k);
    }
}

impl Logistic {
    pub fn new(n0: f64, t0: f64, integrator: Integrator) -> Self {
        Self { n0, t0, integrator }
    }

    /// Start from the first observation; `n0` overrides its y-value if given.
    pub fn from_observations(obs: &ObservationSet, n0: Option<f64>, integrator: Integrator) -> Self {
        let first = obs.first();
        Self::new(n0.unwrap_or(first.y), first.x, integrator)
    }
}

impl ForwardModel for Logistic {
    fn kind(&self) -> ModelKind {
        ModelKind::Logistic
    }

    fn settings(&self) -> ModelSettings {
        ModelSettings::Logistic {
            n0: self.n0,
            t0: self.t0,
            integrator: self.integrator,
        }
    }

    fn predict(&self, params: &[f64], xs: &[f64]) -> Result<Vec<f64>, FitError> {
        check_param_count(self.kind(), params)?;
        let system = LogisticRhs {
            r: params[0],
            k: params[1],
        };
        let states = integrate_to(&system, self.integrator, self.t0, &[self.n0], xs)?;
        Ok(states.into_iter().map(|s| s[0]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_form(n0: f64, r: f64, k: f64, t: f64) -> f64 {
        k / (1.0 + (k - n0) / n0 * (-r * t).exp())
    }

    #[test]
    fn integration_matches_closed_form() {
        let times: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        for integrator in [Integrator::default(), Integrator::Rk4 { step: 0.01 }] {
            let model = Logistic::new(10.0, 0.0, integrator);
            let ys = model.predict(&[1.0, 150.0], &times).unwrap();
            for (&t, &y) in times.iter().zip(&ys) {
                let exact = closed_form(10.0, 1.0, 150.0, t);
                assert!((y - exact).abs() < 1e-5, "{integrator:?} t={t}: {y} vs {exact}");
            }
        }
    }

    #[test]
    fn adjacent_output_times_agree_across_integrators() {
        let next = f64::from_bits(10f64.to_bits() + 1);
        let times = [0.0, 10.0, next];
        let adaptive = Logistic::new(10.0, 0.0, Integrator::default())
            .predict(&[0.5, 150.0], &times)
            .unwrap();
        let fixed = Logistic::new(10.0, 0.0, Integrator::Rk4 { step: 0.01 })
            .predict(&[0.5, 150.0], &times)
            .unwrap();
        let exact = closed_form(10.0, 0.5, 150.0, 10.0);
        for ys in [&adaptive, &fixed] {
            assert_eq!(ys[0], 10.0);
            assert!((ys[1] - exact).abs() < 1e-5, "{} vs {exact}", ys[1]);
            assert!((ys[2] - ys[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn negative_capacity_reports_integration_failure() {
        let model = Logistic::new(10.0, 0.0, Integrator::default());
        let err = model.predict(&[1.0, -10.0], &[0.0, 5.0]).unwrap_err();
        assert!(matches!(err, FitError::Integration(_)));
    }

    #[test]
    fn zero_capacity_does_not_panic() {
        let model = Logistic::new(10.0, 0.0, Integrator::Rk4 { step: 0.1 });
        assert!(model.predict(&[1.0, 0.0], &[1.0]).is_err());
    }
}
