//! # Forecast Engine
//!
//! Short-horizon price forecasting for daily equity series.
//!
//! ## Features
//!
//! - Price sources (Yahoo Finance chart API, local CSV) behind a last-query cache
//! - Cleaning of raw observations into a gap-free daily series
//! - A seasonal model (changepoint trend, Fourier seasonality, country holidays)
//!   tuned by a seeded random grid search scored with rolling-origin
//!   cross-validation
//! - Automated model selection: a panel of classical families is compared,
//!   the best are tuned and blended (geometric mean, mean or median)
//! - Sequential or parallel fold evaluation with a bounded wait per fold
//!
//! ## Strategies
//!
//! Both strategies share one stage machine:
//!
//! ```text
//! INITIALIZED -> SEARCHING -----------> FINALIZING -> FORECASTING
//!             -> COMPARING -> TUNING -> FINALIZING -> FORECASTING
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_engine::config::{DashboardConfig, Strategy};
//! use forecast_engine::pipeline::ForecastPipeline;
//! use forecast_engine::source::{CachedSource, YahooSource};
//!
//! # fn main() -> forecast_engine::Result<()> {
//! let config = DashboardConfig {
//!     symbol: "INFY.NS".to_string(),
//!     strategy: Strategy::AutomlEnsemble,
//!     ..DashboardConfig::default()
//! };
//!
//! let pipeline = ForecastPipeline::new(CachedSource::new(YahooSource::new()?), config)?;
//! let report = pipeline.run()?;
//!
//! for row in report.forecast() {
//!     println!("{} {:.2} [{:.2}, {:.2}]", row.date, row.forecast, row.lower, row.upper);
//! }
//! # Ok(())
//! # }
//! ```

pub mod automl;
pub mod config;
pub mod cv;
pub mod data;
pub mod error;
pub mod holidays;
pub mod metrics;
pub mod models;
pub mod params;
pub mod pipeline;
pub mod preprocess;
pub mod progress;
pub mod search;
pub mod source;
pub mod stage;
pub mod trainer;

// Re-export commonly used types
pub use crate::config::{DashboardConfig, Strategy};
pub use crate::data::{ComponentRow, ForecastRow, RawObservation, TimeSeries};
pub use crate::error::{ForecastError, RequestContext, Result};
pub use crate::models::{CandidateModel, ForecastModel, ForecastResult, ModelFamily};
pub use crate::pipeline::{ForecastPipeline, PipelineReport, StrategyReport};
pub use crate::source::PriceSource;
pub use crate::stage::Stage;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
