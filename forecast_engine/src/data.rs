//! Daily price series and forecast output rows

use crate::error::{ForecastError, Result};
use crate::stage::Stage;
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Gap-free daily series of a single price for one symbol.
///
/// Stored as a start date plus one value per consecutive calendar day, so
/// timestamps are strictly increasing at a fixed daily step by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    symbol: String,
    start: NaiveDate,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series from consecutive daily values starting at `start`
    pub fn new(symbol: impl Into<String>, start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::InsufficientHistory {
                stage: Stage::Initialized,
                required: 1,
                actual: 0,
            });
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Series value at position {} is not finite",
                idx
            )));
        }

        Ok(Self {
            symbol: symbol.into(),
            start,
            values,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Date of the first observation
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Date of the last observation
    pub fn end(&self) -> NaiveDate {
        self.date_at(self.values.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Values within an index range, clamped to the series
    pub fn window(&self, range: Range<usize>) -> &[f64] {
        let end = range.end.min(self.values.len());
        let start = range.start.min(end);
        &self.values[start..end]
    }

    /// Calendar date of the observation at `idx` (may lie past the end)
    pub fn date_at(&self, idx: usize) -> NaiveDate {
        self.start + Duration::days(idx as i64)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.values.len()).map(move |i| self.date_at(i))
    }

    /// The `periods` calendar days following the last observation
    pub fn future_dates(&self, periods: usize) -> Vec<NaiveDate> {
        let n = self.values.len();
        (n..n + periods).map(|i| self.date_at(i)).collect()
    }

    /// First `n` observations as a new series
    pub fn head(&self, n: usize) -> Result<Self> {
        if n == 0 || n > self.values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Cannot take a prefix of {} from a series of {} observations",
                n,
                self.values.len()
            )));
        }

        Ok(Self {
            symbol: self.symbol.clone(),
            start: self.start,
            values: self.values[..n].to_vec(),
        })
    }

    pub fn last_value(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self.dates().map(|d| d.to_string()).collect();
        let df = DataFrame::new(vec![
            Series::new("date", dates),
            Series::new("value", self.values.clone()),
        ])?;
        Ok(df)
    }
}

/// One provider observation before cleaning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl RawObservation {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

/// One future period of a forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub forecast: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Additive breakdown of one forecast period in price units. Multiplicative
/// seasonality is reported as its price effect, so the parts always sum to
/// the point forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentRow {
    pub date: NaiveDate,
    pub trend: f64,
    pub weekly: f64,
    pub yearly: f64,
    pub holidays: f64,
}

impl ComponentRow {
    pub fn total(&self) -> f64 {
        self.trend + self.weekly + self.yearly + self.holidays
    }
}

/// Tabulate forecast rows as `date, forecast, lower, upper`
pub fn forecast_frame(rows: &[ForecastRow]) -> Result<DataFrame> {
    let dates: Vec<String> = rows.iter().map(|r| r.date.to_string()).collect();
    let df = DataFrame::new(vec![
        Series::new("date", dates),
        Series::new("forecast", rows.iter().map(|r| r.forecast).collect::<Vec<_>>()),
        Series::new("lower", rows.iter().map(|r| r.lower).collect::<Vec<_>>()),
        Series::new("upper", rows.iter().map(|r| r.upper).collect::<Vec<_>>()),
    ])?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dates_are_daily() {
        let series = TimeSeries::new("INFY.NS", date(2024, 2, 27), vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        let dates: Vec<_> = series.dates().collect();
        assert_eq!(
            dates,
            vec![date(2024, 2, 27), date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]
        );
        assert_eq!(series.end(), date(2024, 3, 1));
        assert_eq!(series.future_dates(2), vec![date(2024, 3, 2), date(2024, 3, 3)]);
    }

    #[test]
    fn test_head_and_window() {
        let series = TimeSeries::new("X", date(2024, 1, 1), (0..10).map(f64::from).collect()).unwrap();

        let prefix = series.head(4).unwrap();
        assert_eq!(prefix.values(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(prefix.start(), series.start());
        assert!(series.head(0).is_err());
        assert!(series.head(11).is_err());

        assert_eq!(series.window(8..20), &[8.0, 9.0]);
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(matches!(
            TimeSeries::new("X", date(2024, 1, 1), vec![]),
            Err(ForecastError::InsufficientHistory { actual: 0, .. })
        ));
        assert!(TimeSeries::new("X", date(2024, 1, 1), vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_forecast_frame_shape() {
        let rows = vec![
            ForecastRow { date: date(2024, 1, 2), forecast: 10.0, lower: 9.0, upper: 11.0 },
            ForecastRow { date: date(2024, 1, 3), forecast: 10.5, lower: 9.2, upper: 11.9 },
        ];
        let df = forecast_frame(&rows).unwrap();
        assert_eq!(df.shape(), (2, 4));
        assert_eq!(df.get_column_names(), vec!["date", "forecast", "lower", "upper"]);
    }
}
