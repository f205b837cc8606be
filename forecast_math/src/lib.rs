//! # Forecast Math
//!
//! Numeric building blocks shared by the forecasting models:
//!
//! - descriptive statistics and empirical quantiles ([`stats`])
//! - ridge-penalised least squares via Cholesky ([`linalg`])
//! - Fourier seasonality terms ([`fourier`])
//! - rolling and exponential smoothers ([`moving_averages`])

use thiserror::Error;

pub mod fourier;
pub mod linalg;
pub mod moving_averages;
pub mod stats;

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
