//! Error types.
//!
//! - `FitError` is returned by the library (grid construction, models, search).
//! - `AppError` is the binary-facing error: a message plus a process exit code.

use thiserror::Error;

/// Failure conditions of a least-squares grid search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Two sequences that must be aligned element-by-element have different lengths.
    #[error("Dimension mismatch: expected {expected} values, got {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Input rejected before any evaluation (empty grid, malformed axis, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Every grid point produced a non-finite residual sum.
    #[error("No valid fit: all {grid_points} grid points produced non-finite residuals.")]
    NoValidFit { grid_points: usize },

    /// Numerical integration did not complete for one parameter point.
    #[error("ODE integration failed: {0}")]
    Integration(String),
}

impl FitError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FitError::InvalidInput(message.into())
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::InvalidInput(_) => 2,
            FitError::NoValidFit { .. } => 3,
            FitError::DimensionMismatch { .. } | FitError::Integration(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_distinct_exit_codes() {
        let invalid: AppError = FitError::invalid("empty grid").into();
        let no_fit: AppError = FitError::NoValidFit { grid_points: 3 }.into();
        let dims: AppError = FitError::DimensionMismatch { expected: 2, actual: 3 }.into();
        assert_eq!(invalid.exit_code(), 2);
        assert_eq!(no_fit.exit_code(), 3);
        assert_eq!(dims.exit_code(), 4);
        assert!(no_fit.to_string().contains("3 grid points"));
    }
}
