//! Exponential smoothing family: simple, Holt linear, additive Holt-Winters
//! and the theta method

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{
    dated_forecast, ensure_history, ensure_horizon, residual_sigma, ForecastModel, ForecastResult,
    TrainedForecastModel, DEFAULT_INTERVAL_WIDTH,
};
use chrono::NaiveDate;
use forecast_math::moving_averages::ExponentialSmoother;
use forecast_math::stats::{linear_trend, mean};

fn check_smoothing(label: &str, value: f64) -> Result<()> {
    if value <= 0.0 || value >= 1.0 || !value.is_finite() {
        return Err(ForecastError::InvalidParameter(format!(
            "{} must be between 0 and 1, got {}",
            label, value
        )));
    }
    Ok(())
}

/// Level-only smoothing; the forecast is flat at the final level
#[derive(Debug, Clone)]
pub struct SimpleExponentialSmoothing {
    name: String,
    alpha: f64,
}

#[derive(Debug, Clone)]
pub struct TrainedSimpleExponentialSmoothing {
    name: String,
    end: NaiveDate,
    level: f64,
    sigma: f64,
}

impl SimpleExponentialSmoothing {
    pub fn new(alpha: f64) -> Result<Self> {
        check_smoothing("Alpha", alpha)?;

        Ok(Self {
            name: format!("Exponential Smoothing (alpha={})", alpha),
            alpha,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

/// Run the smoother over `values`, returning the final level and the
/// one-step residuals.
fn smooth_level(alpha: f64, values: &[f64]) -> Result<(f64, Vec<f64>)> {
    let mut smoother = ExponentialSmoother::new(alpha)?;
    let residuals = smoother
        .one_step_predictions(values)
        .into_iter()
        .zip(values)
        .filter_map(|(pred, actual)| pred.map(|p| actual - p))
        .collect();
    Ok((smoother.value()?, residuals))
}

impl ForecastModel for SimpleExponentialSmoothing {
    type Trained = TrainedSimpleExponentialSmoothing;

    fn train(&self, series: &TimeSeries) -> Result<Self::Trained> {
        ensure_history(&self.name, self.min_history(), series.len())?;
        let (level, residuals) = smooth_level(self.alpha, series.values())?;

        Ok(TrainedSimpleExponentialSmoothing {
            name: self.name.clone(),
            end: series.end(),
            level,
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

impl TrainedForecastModel for TrainedSimpleExponentialSmoothing {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ensure_horizon(horizon)?;
        // constant at the last level
        dated_forecast(self.end, vec![self.level; horizon], self.sigma, DEFAULT_INTERVAL_WIDTH)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Holt's linear trend method
#[derive(Debug, Clone)]
pub struct HoltLinear {
    name: String,
    alpha: f64,
    beta: f64,
}

#[derive(Debug, Clone)]
pub struct TrainedHoltLinear {
    name: String,
    end: NaiveDate,
    level: f64,
    trend: f64,
    sigma: f64,
}

impl HoltLinear {
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        check_smoothing("Alpha", alpha)?;
        check_smoothing("Beta", beta)?;

        Ok(Self {
            name: format!("Holt Linear (alpha={}, beta={})", alpha, beta),
            alpha,
            beta,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

impl ForecastModel for HoltLinear {
    type Trained = TrainedHoltLinear;

    fn train(&self, series: &TimeSeries) -> Result<Self::Trained> {
        ensure_history(&self.name, self.min_history(), series.len())?;
        let values = series.values();

        let mut level = values[0];
        let mut trend = values[1] - values[0];
        let mut residuals = Vec::with_capacity(values.len() - 1);
        for &y in &values[1..] {
            residuals.push(y - (level + trend));
            let next_level = self.alpha * y + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (next_level - level) + (1.0 - self.beta) * trend;
            level = next_level;
        }

        Ok(TrainedHoltLinear {
            name: self.name.clone(),
            end: series.end(),
            level,
            trend,
            sigma: residual_sigma(&residuals),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        3
    }
}

impl TrainedForecastModel for TrainedHoltLinear {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ensure_horizon(horizon)?;
        let points = (1..=horizon)
            .map(|k| self.level + k as f64 * self.trend)
            .collect();
        dated_forecast(self.end, points, self.sigma, DEFAULT_INTERVAL_WIDTH)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Additive Holt-Winters with a fixed seasonal period.
///
/// Initial level and trend come from the first two seasons; initial
/// seasonal indices are the first season's deviations from its mean.
#[derive(Debug, Clone)]
pub struct HoltWinters {
    name: String,
    alpha: f64,
    beta: f64,
    gamma: f64,
    period: usize,
}

#[derive(Debug, Clone)]
pub struct TrainedHoltWinters {
    name: String,
    end: NaiveDate,
    level: f64,
    trend: f64,
    /// Seasonal index for absolute position `t` lives at `t % period`
    seasonals: Vec<f64>,
    observed: usize,
    sigma: f64,
}

impl HoltWinters {
    pub fn new(alpha: f64, beta: f64, gamma: f64, period: usize) -> Result<Self> {
        check_smoothing("Alpha", alpha)?;
        check_smoothing("Beta", beta)?;
        check_smoothing("Gamma", gamma)?;
        if period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonal period must be at least 2, got {}",
                period
            )));
        }

        Ok(Self {
            name: format!(
                "Holt-Winters Additive (alpha={}, beta={}, gamma={}, period={})",
                alpha, beta, gamma, period
            ),
            alpha,
            beta,
            gamma,
            period,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl ForecastModel for HoltWinters {
    type Trained = TrainedHoltWinters;

    fn train(&self, series: &TimeSeries) -> Result<Self::Trained> {
        ensure_history(&self.name, self.min_history(), series.len())?;
        let values = series.values();
        let p = self.period;

        let first = mean(&values[..p])?;
        let second = mean(&values[p..2 * p])?;
        let mut level = first;
        let mut trend = (second - first) / p as f64;
        let mut seasonals: Vec<f64> = values[..p].iter().map(|y| y - first).collect();

        let mut residuals = Vec::with_capacity(values.len() - p);
        for (t, &y) in values.iter().enumerate().skip(p) {
            let s = seasonals[t % p];
            residuals.push(y - (level + trend + s));

            let next_level = self.alpha * (y - s) + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (next_level - level) + (1.0 - self.beta) * trend;
            seasonals[t % p] = self.gamma * (y - next_level) + (1.0 - self.gamma) * s;
            level = next_level;
        }

        Ok(TrainedHoltWinters {
            name: self.name.clone(),
            end: series.end(),
            level,
            trend,
            seasonals,
            observed: values.len(),
            sigma: residual_sigma(&residuals),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        2 * self.period
    }
}

impl TrainedForecastModel for TrainedHoltWinters {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ensure_horizon(horizon)?;
        let p = self.seasonals.len();
        let points = (1..=horizon)
            .map(|k| {
                let t = self.observed - 1 + k;
                self.level + k as f64 * self.trend + self.seasonals[t % p]
            })
            .collect();
        dated_forecast(self.end, points, self.sigma, DEFAULT_INTERVAL_WIDTH)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Theta method: simple exponential smoothing of the series plus half of
/// its least-squares slope, with the drift adjusted for the smoothing lag
#[derive(Debug, Clone)]
pub struct ThetaModel {
    name: String,
    alpha: f64,
}

#[derive(Debug, Clone)]
pub struct TrainedTheta {
    name: String,
    end: NaiveDate,
    level: f64,
    slope: f64,
    alpha: f64,
    observed: usize,
    sigma: f64,
}

impl ThetaModel {
    pub fn new(alpha: f64) -> Result<Self> {
        check_smoothing("Alpha", alpha)?;

        Ok(Self {
            name: format!("Theta (alpha={})", alpha),
            alpha,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl ForecastModel for ThetaModel {
    type Trained = TrainedTheta;

    fn train(&self, series: &TimeSeries) -> Result<Self::Trained> {
        ensure_history(&self.name, self.min_history(), series.len())?;
        let (level, residuals) = smooth_level(self.alpha, series.values())?;
        let (slope, _) = linear_trend(series.values())?;

        Ok(TrainedTheta {
            name: self.name.clone(),
            end: series.end(),
            level,
            slope,
            alpha: self.alpha,
            observed: series.len(),
            sigma: residual_sigma(&residuals),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        3
    }
}

impl TrainedForecastModel for TrainedTheta {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ensure_horizon(horizon)?;
        let a = self.alpha;
        let lag = 1.0 / a - (1.0 - a).powi(self.observed as i32) / a;
        let points = (1..=horizon)
            .map(|k| self.level + 0.5 * self.slope * (k as f64 - 1.0 + lag))
            .collect();
        dated_forecast(self.end, points, self.sigma, DEFAULT_INTERVAL_WIDTH)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
