//! Explicit Runge–Kutta integration for small ODE systems.
//!
//! Two integrators are provided:
//!
//! - `Rk4`: classic fixed-step fourth order. Each interval between requested
//!   output times is split into equal sub-steps no larger than `step`, so output
//!   times are hit exactly.
//! - `Dopri5`: Dormand–Prince 5(4) with embedded error estimate and adaptive
//!   step size. Deterministic for fixed `rtol`/`atol`/`max_steps`.
//!
//! Output times may be given in any order; integration runs piecewise from the
//! previous output time to the next one, backwards in time if needed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FitError;

/// Right-hand side `dy/dt = f(t, y)`.
pub trait OdeSystem {
    /// Dimension of the state vector.
    fn dimension(&self) -> usize;

    /// Evaluate `f(t, y)` into `out`.
    fn rhs(&self, t: f64, y: &[f64], out: &mut [f64]);
}

/// Integration method and its numerical settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Integrator {
    Rk4 { step: f64 },
    Dopri5 { rtol: f64, atol: f64, max_steps: usize },
}

impl Integrator {
    /// Reject settings no integration could run with.
    pub fn validate(&self) -> Result<(), IntegrationError> {
        match *self {
            Integrator::Rk4 { step } => {
                if !(step.is_finite() && step > 0.0) {
                    return Err(IntegrationError::InvalidSettings(format!(
                        "rk4 step must be finite and > 0, got {step}"
                    )));
                }
            }
            Integrator::Dopri5 {
                rtol,
                atol,
                max_steps,
            } => {
                if !(rtol.is_finite() && atol.is_finite() && rtol >= 0.0 && atol >= 0.0 && rtol + atol > 0.0) {
                    return Err(IntegrationError::InvalidSettings(format!(
                        "dopri5 tolerances must be finite, >= 0, and not both zero (rtol={rtol}, atol={atol})"
                    )));
                }
                if max_steps == 0 {
                    return Err(IntegrationError::InvalidSettings(
                        "dopri5 max_steps must be > 0".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Integrator::Dopri5 {
            rtol: 1e-8,
            atol: 1e-10,
            max_steps: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("invalid integrator settings: {0}")]
    InvalidSettings(String),
    #[error("initial state has dimension {actual}, system expects {expected}")]
    Dimension { expected: usize, actual: usize },
    #[error("state became non-finite at t={t}")]
    NonFinite { t: f64 },
    #[error("step size underflow at t={t}")]
    StepUnderflow { t: f64 },
    #[error("exceeded {max_steps} steps before reaching t={target}")]
    MaxSteps { max_steps: usize, target: f64 },
}

impl From<IntegrationError> for FitError {
    fn from(err: IntegrationError) -> Self {
        FitError::Integration(err.to_string())
    }
}

/// Integrate from `(t0, y0)` and return the state at each of `times`.
pub fn integrate_to(
    system: &impl OdeSystem,
    integrator: Integrator,
    t0: f64,
    y0: &[f64],
    times: &[f64],
) -> Result<Vec<Vec<f64>>, IntegrationError> {
    let dim = system.dimension();
    if y0.len() != dim {
        return Err(IntegrationError::Dimension {
            expected: dim,
            actual: y0.len(),
        });
    }
    if !t0.is_finite() || times.iter().any(|t| !t.is_finite()) {
        return Err(IntegrationError::InvalidSettings(
            "integration times must be finite".to_string(),
        ));
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(IntegrationError::NonFinite { t: t0 });
    }

    integrator.validate()?;

    let mut t = t0;
    let mut y = y0.to_vec();
    let mut out = Vec::with_capacity(times.len());

    match integrator {
        Integrator::Rk4 { step } => {
            let mut stepper = Rk4::new(dim);
            for &target in times {
                stepper.advance(system, &mut t, &mut y, target, step)?;
                out.push(y.clone());
            }
        }
        Integrator::Dopri5 {
            rtol,
            atol,
            max_steps,
        } => {
            let mut stepper = Dopri5::new(dim, rtol, atol, max_steps);
            for &target in times {
                stepper.advance(system, &mut t, &mut y, target)?;
                out.push(y.clone());
            }
        }
    }

    Ok(out)
}

/// Classic Runge-Kutta 4th order stepper.
struct Rk4 {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    tmp: Vec<f64>,
}

impl Rk4 {
    fn new(dim: usize) -> Self {
        Self {
            k1: vec![0.0; dim],
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            tmp: vec![0.0; dim],
        }
    }

    fn advance(
        &mut self,
        system: &impl OdeSystem,
        t: &mut f64,
        y: &mut [f64],
        target: f64,
        max_step: f64,
    ) -> Result<(), IntegrationError> {
        let span = target - *t;
        if span == 0.0 {
            return Ok(());
        }
        let n = (span.abs() / max_step).ceil().max(1.0) as usize;
        let h = span / n as f64;
        let start = *t;
        for i in 0..n {
            let ti = start + h * i as f64;
            self.step(system, ti, y, h);
            if y.iter().any(|v| !v.is_finite()) {
                return Err(IntegrationError::NonFinite { t: ti + h });
            }
        }
        *t = target;
        Ok(())
    }

    fn step(&mut self, system: &impl OdeSystem, t: f64, y: &mut [f64], h: f64) {
        let n = y.len();

        // k1 = f(t, y)
        system.rhs(t, y, &mut self.k1);

        // k2 = f(t + h/2, y + h*k1/2)
        for i in 0..n {
            self.tmp[i] = y[i] + 0.5 * h * self.k1[i];
        }
        system.rhs(t + 0.5 * h, &self.tmp, &mut self.k2);

        // k3 = f(t + h/2, y + h*k2/2)
        for i in 0..n {
            self.tmp[i] = y[i] + 0.5 * h * self.k2[i];
        }
        system.rhs(t + 0.5 * h, &self.tmp, &mut self.k3);

        // k4 = f(t + h, y + h*k3)
        for i in 0..n {
            self.tmp[i] = y[i] + h * self.k3[i];
        }
        system.rhs(t + h, &self.tmp, &mut self.k4);

        for i in 0..n {
            y[i] += h / 6.0 * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
        }
    }
}

// Dormand–Prince tableau.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights (also the last stage row, FSAL).
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between 5th- and 4th-order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

struct Dopri5 {
    rtol: f64,
    atol: f64,
    max_steps: usize,
    /// Last accepted step magnitude, reused as the next initial guess.
    h: Option<f64>,
    k: [Vec<f64>; 7],
    tmp: Vec<f64>,
    y5: Vec<f64>,
}

impl Dopri5 {
    fn new(dim: usize, rtol: f64, atol: f64, max_steps: usize) -> Self {
        Self {
            rtol,
            atol,
            max_steps,
            h: None,
            k: std::array::from_fn(|_| vec![0.0; dim]),
            tmp: vec![0.0; dim],
            y5: vec![0.0; dim],
        }
    }

    fn advance(
        &mut self,
        system: &impl OdeSystem,
        t: &mut f64,
        y: &mut [f64],
        target: f64,
    ) -> Result<(), IntegrationError> {
        let span = target - *t;
        if span == 0.0 {
            return Ok(());
        }
        let dir = span.signum();
        let mut h = self.h.unwrap_or(span.abs() * 1e-2).min(span.abs());
        let mut steps = 0usize;

        while (target - *t) * dir > 0.0 {
            if steps >= self.max_steps {
                return Err(IntegrationError::MaxSteps {
                    max_steps: self.max_steps,
                    target,
                });
            }
            steps += 1;

            let remaining = (target - *t).abs();
            let last = h >= remaining;
            if last {
                h = remaining;
            }
            let hs = dir * h;

            let err = self.trial_step(system, *t, y, hs);

            if err.is_finite() && err <= 1.0 {
                *t = if last { target } else { *t + hs };
                y.copy_from_slice(&self.y5);
                if y.iter().any(|v| !v.is_finite()) {
                    return Err(IntegrationError::NonFinite { t: *t });
                }
                if last {
                    // A truncated final step says nothing about the next interval.
                    return Ok(());
                }
                self.h = Some(h);
            }

            let factor = if !err.is_finite() {
                MIN_FACTOR
            } else if err == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            h *= factor;

            if h <= 1e-14 * t.abs().max(1.0) {
                return Err(IntegrationError::StepUnderflow { t: *t });
            }
        }

        Ok(())
    }

    /// Compute a candidate step into `self.y5` and return its scaled error norm.
    fn trial_step(&mut self, system: &impl OdeSystem, t: f64, y: &[f64], h: f64) -> f64 {
        let n = y.len();
        let [k1, k2, k3, k4, k5, k6, k7] = &mut self.k;

        system.rhs(t, y, k1);

        for i in 0..n {
            self.tmp[i] = y[i] + h * A21 * k1[i];
        }
        system.rhs(t + C2 * h, &self.tmp, k2);

        for i in 0..n {
            self.tmp[i] = y[i] + h * (A31 * k1[i] + A32 * k2[i]);
        }
        system.rhs(t + C3 * h, &self.tmp, k3);

        for i in 0..n {
            self.tmp[i] = y[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
        }
        system.rhs(t + C4 * h, &self.tmp, k4);

        for i in 0..n {
            self.tmp[i] = y[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
        }
        system.rhs(t + C5 * h, &self.tmp, k5);

        for i in 0..n {
            self.tmp[i] =
                y[i] + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
        }
        system.rhs(t + h, &self.tmp, k6);

        for i in 0..n {
            self.y5[i] =
                y[i] + h * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
        }
        system.rhs(t + h, &self.y5, k7);

        let mut acc = 0.0;
        for i in 0..n {
            let e = h * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
            let scale = self.atol + self.rtol * y[i].abs().max(self.y5[i].abs());
            acc += (e / scale).powi(2);
        }
        (acc / n.max(1) as f64).sqrt()
    }
}
