//! # Equity Forecast Workbench
//!
//! Facade over the workspace crates:
//!
//! - [`math`]: statistics, ridge least squares, Fourier terms and smoothers
//! - [`engine`]: sources, preprocessing, models, cross-validation, search,
//!   model selection and the request pipeline
//! - [`dash`]: constituent list, table rendering and export used by the
//!   `forecast-dash` binary
//!
//! ## Example
//!
//! ```
//! use equity_forecast_workspace::prelude::*;
//! use chrono::NaiveDate;
//!
//! let series = TimeSeries::new("INFY.NS", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), vec![10.0; 30]).unwrap();
//! let forecast = ModelFamily::Naive
//!     .default_model()
//!     .unwrap()
//!     .train(&series)
//!     .unwrap()
//!     .forecast(3)
//!     .unwrap();
//! assert_eq!(forecast.values(), &[10.0, 10.0, 10.0]);
//! ```

pub use forecast_dash as dash;
pub use forecast_engine as engine;
pub use forecast_math as math;

/// The types most callers need
pub mod prelude {
    pub use forecast_engine::models::TrainedForecastModel;
    pub use forecast_engine::{
        DashboardConfig, ForecastError, ForecastModel, ForecastPipeline, ForecastRow, ModelFamily,
        PriceSource, Stage, Strategy, TimeSeries,
    };
}
