//! Price providers
//!
//! Every source returns a cleaned daily [`TimeSeries`] or an error; a
//! partially populated series is never handed back.

pub mod cache;
pub mod csv;
pub mod yahoo;

pub use self::cache::{CacheStats, CachedSource};
pub use self::csv::CsvSource;
pub use self::yahoo::YahooSource;

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;

/// Fetches the price history of one symbol over `[start, end)`
pub trait PriceSource: Send + Sync {
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

impl<S: PriceSource + ?Sized> PriceSource for Box<S> {
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        (**self).fetch(symbol, start, end)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

pub(crate) fn check_range(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
    if symbol.trim().is_empty() {
        return Err(ForecastError::Configuration(
            "Symbol must not be empty".to_string(),
        ));
    }
    if start >= end {
        return Err(ForecastError::Configuration(format!(
            "Start date {start} must precede end date {end}"
        )));
    }
    Ok(())
}

pub(crate) fn unavailable(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    reason: impl Into<String>,
) -> ForecastError {
    ForecastError::DataUnavailable {
        symbol: symbol.to_string(),
        start,
        end,
        reason: reason.into(),
    }
}
