//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observations and parameter grids (`ObservationSet`, `ParameterGrid`)
//! - search outputs (`ResidualTable`, `BestFit`, `FitQuality`)
//! - model selection and configuration (`ModelKind`, `ModelSettings`, `FitConfig`)

pub mod types;

pub use types::*;
