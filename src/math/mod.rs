//! Numerical utilities: residual sums and ODE integration.

pub mod lsq;
pub mod ode;

pub use lsq::*;
pub use ode::{integrate_to, IntegrationError, Integrator, OdeSystem};
