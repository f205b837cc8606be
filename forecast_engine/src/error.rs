//! Error types for the forecast_engine crate

use crate::stage::Stage;
use chrono::NaiveDate;
use forecast_math::MathError;
use polars::prelude::PolarsError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Identifies the forecast request an error belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub stage: Stage,
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} .. {}] during {}",
            self.symbol, self.start, self.end, self.stage
        )
    }
}

/// Custom error types for the forecast_engine crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The provider returned nothing usable for the requested range
    #[error("No data for {symbol} between {start} and {end}: {reason}")]
    DataUnavailable {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    /// Too few observations for the configured windows; raised before fitting
    #[error("Insufficient history during {stage}: need at least {required} observations, have {actual}")]
    InsufficientHistory {
        stage: Stage,
        required: usize,
        actual: usize,
    },

    /// No candidate produced a usable score, or a blend could not be formed
    #[error("Selection failed during {stage}: {reason}")]
    SelectionFailure { stage: Stage, reason: String },

    /// Invalid user-facing configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A model could not be fitted or could not forecast
    #[error("Model error: {0}")]
    Model(String),

    /// A parallel fold did not report in time
    #[error("Cross-validation timed out with {pending} fold(s) outstanding after {timeout:?}")]
    FoldTimeout { pending: usize, timeout: Duration },

    /// Internal lifecycle violation
    #[error("Invalid stage transition from {from} to {to}")]
    InvalidStageTransition { from: Stage, to: Stage },

    /// Any of the above, tagged with the request it happened in
    #[error("{context}: {source}")]
    Request {
        context: RequestContext,
        #[source]
        source: Box<ForecastError>,
    },

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Transport level failure talking to a provider
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Error from the numeric kernels
    #[error("Math error: {0}")]
    MathError(#[from] MathError),

    /// Error while encoding or decoding reports and configuration
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    /// Attach the request context. An error that already carries one keeps it.
    pub fn in_request(self, context: RequestContext) -> Self {
        match self {
            ForecastError::Request { .. } => self,
            other => ForecastError::Request {
                context,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any request context stripped
    pub fn root(&self) -> &ForecastError {
        match self {
            ForecastError::Request { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn context(&self) -> Option<&RequestContext> {
        match self {
            ForecastError::Request { context, .. } => Some(context),
            _ => None,
        }
    }
}

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        ForecastError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::Configuration(err.to_string())
    }
}

impl From<toml::ser::Error> for ForecastError {
    fn from(err: toml::ser::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}
