//! `gridfit` library crate.
//!
//! Brute-force least-squares parameter search: evaluate a forward model at
//! every point of a parameter grid, score each point by the summed squared
//! residual against the observations, and pick the minimizing point.
//!
//! The binary (`gridfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the search can be driven from other programs with custom models

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
