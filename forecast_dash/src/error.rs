//! Error types for the forecast_dash crate

use forecast_engine::ForecastError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("Constituent list error: {0}")]
    Universe(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error(transparent)]
    Engine(#[from] ForecastError),
}

impl From<polars::prelude::PolarsError> for DashError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        DashError::Export(err.to_string())
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashError>;
