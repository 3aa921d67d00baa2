//! Seasonal sine wave: `y(x) = A · sin(2π/T · x + b) + c`.
//!
//! Used for phenology curves, where amplitude `A`, period `T`, and offset `c`
//! are known from the domain and only the phase `b` is searched.

use std::f64::consts::TAU;

use crate::domain::{ModelKind, ModelSettings};
use crate::error::FitError;
use crate::models::model::{check_param_count, ForwardModel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sine {
    pub amplitude: f64,
    pub period: f64,
    pub offset: f64,
}

impl Sine {
    pub fn new(amplitude: f64, period: f64, offset: f64) -> Self {
        Self {
            amplitude,
            period,
            offset,
        }
    }
}

impl ForwardModel for Sine {
    fn kind(&self) -> ModelKind {
        ModelKind::Sine
    }

    fn settings(&self) -> ModelSettings {
        ModelSettings::Sine {
            amplitude: self.amplitude,
            period: self.period,
            offset: self.offset,
        }
    }

    fn predict(&self, params: &[f64], xs: &[f64]) -> Result<Vec<f64>, FitError> {
        check_param_count(self.kind(), params)?;
        let b = params[0];
        let w = TAU / self.period;
        Ok(xs
            .iter()
            .map(|&x| self.amplitude * (w * x + b).sin() + self.offset)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn phase_shifts_the_peak() {
        let model = Sine::new(2.0, 4.0, 1.0);
        let ys = model.predict(&[FRAC_PI_2], &[0.0, 1.0, 2.0]).unwrap();
        assert!((ys[0] - 3.0).abs() < 1e-12);
        assert!((ys[1] - 1.0).abs() < 1e-12);
        assert!((ys[2] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_period_yields_non_finite_not_panic() {
        let model = Sine::new(1.0, 0.0, 0.0);
        let ys = model.predict(&[0.0], &[1.0]).unwrap();
        assert!(!ys[0].is_finite());
    }
}
