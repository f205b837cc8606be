//! Benchmark forecasters: naive, seasonal naive, drift and moving average

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{
    dated_forecast, ensure_history, ensure_horizon, residual_sigma, ForecastModel, ForecastResult,
    TrainedForecastModel, DEFAULT_INTERVAL_WIDTH,
};
use chrono::NaiveDate;
use forecast_math::moving_averages::SimpleMovingAverage;

/// Repeats the last observation
#[derive(Debug, Clone)]
pub struct NaiveModel {
    name: String,
}

#[derive(Debug, Clone)]
pub struct TrainedNaive {
    name: String,
    end: NaiveDate,
    last: f64,
    sigma: f64,
}

impl NaiveModel {
    pub fn new() -> Self {
        Self {
            name: "Naive".to_string(),
        }
    }
}

impl Default for NaiveModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastModel for NaiveModel {
    type Trained = TrainedNaive;

    fn train(&self, series: &TimeSeries) -> Result<TrainedNaive> {
        ensure_history(&self.name, self.min_history(), series.len())?;
        let values = series.values();
        let residuals: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

        Ok(TrainedNaive {
            name: self.name.clone(),
            end: series.end(),
            last: series.last_value(),
            sigma: residual_sigma(&residuals),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        2
    }
}

impl TrainedForecastModel for TrainedNaive {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ensure_horizon(horizon)?;
        dated_forecast(self.end, vec![self.last; horizon], self.sigma, DEFAULT_INTERVAL_WIDTH)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Repeats the last full season
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    name: String,
    period: usize,
}

#[derive(Debug, Clone)]
pub struct TrainedSeasonalNaive {
    name: String,
    end: NaiveDate,
    season: Vec<f64>,
    sigma: f64,
}

impl SeasonalNaive {
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(ForecastError::InvalidParameter(
                "Seasonal period must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Seasonal Naive (period={})", period),
            period,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl ForecastModel for SeasonalNaive {
    type Trained = TrainedSeasonalNaive;

    fn train(&self, series: &TimeSeries) -> Result<TrainedSeasonalNaive> {
        ensure_history(&self.name, self.min_history(), series.len())?;
        let values = series.values();
        let residuals: Vec<f64> = (self.period..values.len())
            .map(|t| values[t] - values[t - self.period])
            .collect();

        Ok(TrainedSeasonalNaive {
            name: self.name.clone(),
            end: series.end(),
            season: values[values.len() - self.period..].to_vec(),
            sigma: residual_sigma(&residuals),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        self.period + 1
    }
}

impl TrainedForecastModel for TrainedSeasonalNaive {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ensure_horizon(horizon)?;
        let points = (0..horizon)
            .map(|k| self.season[k % self.season.len()])
            .collect();
        dated_forecast(self.end, points, self.sigma, DEFAULT_INTERVAL_WIDTH)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Extends the straight line joining the first and last observation
#[derive(Debug, Clone)]
pub struct DriftModel {
    name: String,
}

#[derive(Debug, Clone)]
pub struct TrainedDrift {
    name: String,
    end: NaiveDate,
    last: f64,
    slope: f64,
    sigma: f64,
}

impl DriftModel {
    pub fn new() -> Self {
        Self {
            name: "Drift".to_string(),
        }
    }
}

impl Default for DriftModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastModel for DriftModel {
    type Trained = TrainedDrift;

    fn train(&self, series: &TimeSeries) -> Result<TrainedDrift> {
        ensure_history(&self.name, self.min_history(), series.len())?;
        let values = series.values();
        let n = values.len();
        let slope = (values[n - 1] - values[0]) / (n - 1) as f64;
        let residuals: Vec<f64> = values.windows(2).map(|w| w[1] - w[0] - slope).collect();

        Ok(TrainedDrift {
            name: self.name.clone(),
            end: series.end(),
            last: values[n - 1],
            slope,
            sigma: residual_sigma(&residuals),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        2
    }
}

impl TrainedForecastModel for TrainedDrift {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ensure_horizon(horizon)?;
        let points = (1..=horizon)
            .map(|k| self.last + self.slope * k as f64)
            .collect();
        dated_forecast(self.end, points, self.sigma, DEFAULT_INTERVAL_WIDTH)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Flat forecast at the mean of the trailing window
#[derive(Debug, Clone)]
pub struct MovingAverageModel {
    name: String,
    window: usize,
}

#[derive(Debug, Clone)]
pub struct TrainedMovingAverage {
    name: String,
    end: NaiveDate,
    level: f64,
    sigma: f64,
}

impl MovingAverageModel {
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Moving Average (window={})", window),
            window,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl ForecastModel for MovingAverageModel {
    type Trained = TrainedMovingAverage;

    fn train(&self, series: &TimeSeries) -> Result<TrainedMovingAverage> {
        ensure_history(&self.name, self.min_history(), series.len())?;

        let mut sma = SimpleMovingAverage::new(self.window)?;
        let values = series.values();
        let residuals: Vec<f64> = sma
            .one_step_predictions(values)
            .into_iter()
            .zip(values)
            .filter_map(|(pred, actual)| pred.map(|p| actual - p))
            .collect();

        Ok(TrainedMovingAverage {
            name: self.name.clone(),
            end: series.end(),
            level: sma.value()?,
            sigma: residual_sigma(&residuals),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        self.window
    }
}

impl TrainedForecastModel for TrainedMovingAverage {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ensure_horizon(horizon)?;
        dated_forecast(self.end, vec![self.level; horizon], self.sigma, DEFAULT_INTERVAL_WIDTH)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn series(values: Vec<f64>) -> TimeSeries {
        TimeSeries::new("TEST", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn test_naive_repeats_last_value() {
        let trained = NaiveModel::new().train(&series(vec![1.0, 2.0, 4.0])).unwrap();
        let forecast = trained.forecast(3).unwrap();
        assert_eq!(forecast.values(), &[4.0, 4.0, 4.0]);
        assert_eq!(forecast.dates()[0], NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert!(trained.forecast(0).is_err());
    }

    #[test]
    fn test_seasonal_naive_cycles_last_season() {
        let data = series(vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
        let forecast = SeasonalNaive::new(3).unwrap().train(&data).unwrap().forecast(4).unwrap();
        assert_eq!(forecast.values(), &[10.0, 20.0, 30.0, 10.0]);

        assert!(SeasonalNaive::new(0).is_err());
        assert!(SeasonalNaive::new(7).unwrap().train(&data).is_err());
    }

    #[test]
    fn test_drift_extends_line() {
        let data = series(vec![10.0, 12.0, 14.0, 16.0]);
        let trained = DriftModel::new().train(&data).unwrap();
        let forecast = trained.forecast(2).unwrap();
        assert_relative_eq!(forecast.values()[0], 18.0);
        assert_relative_eq!(forecast.values()[1], 20.0);

        // a perfect line leaves no residual spread
        let (lo, hi) = forecast.intervals()[0];
        assert_relative_eq!(lo, hi);
    }

    #[test]
    fn test_moving_average_level() {
        let data = series(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let forecast = MovingAverageModel::new(2)
            .unwrap()
            .train(&data)
            .unwrap()
            .forecast(2)
            .unwrap();
        assert_eq!(forecast.values(), &[4.5, 4.5]);
        assert!(MovingAverageModel::new(0).is_err());
    }
}
