//! Forecasting models for daily price series
//!
//! Every family follows the same two-step shape: a validated configuration
//! implementing [`ForecastModel`] is trained on a [`TimeSeries`] and yields a
//! [`TrainedForecastModel`] that produces dated forecasts with intervals.
//! [`CandidateModel`] closes the set of families so they can be searched,
//! compared and blended uniformly.

use crate::data::{ForecastRow, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::params::ParamSet;
use chrono::{Duration, NaiveDate};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::Debug;

pub mod autoregressive;
pub mod baseline;
pub mod family;
pub mod seasonal;
pub mod smoothing;

pub use autoregressive::{AutoRegressive, TrainedAutoRegressive};
pub use baseline::{
    DriftModel, MovingAverageModel, NaiveModel, SeasonalNaive, TrainedDrift, TrainedMovingAverage,
    TrainedNaive, TrainedSeasonalNaive,
};
pub use family::ModelFamily;
pub use seasonal::{SeasonalConfig, SeasonalModel, SeasonalityMode, TrainedSeasonalModel};
pub use smoothing::{
    HoltLinear, HoltWinters, SimpleExponentialSmoothing, ThetaModel, TrainedHoltLinear,
    TrainedHoltWinters, TrainedSimpleExponentialSmoothing, TrainedTheta,
};

/// Coverage of the prediction intervals unless a model says otherwise
pub const DEFAULT_INTERVAL_WIDTH: f64 = 0.8;

/// Dated point forecasts with lower/upper bounds
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    intervals: Vec<(f64, f64)>,
}

impl ForecastResult {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>, intervals: Vec<(f64, f64)>) -> Result<Self> {
        if values.len() != dates.len() || values.len() != intervals.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Forecast has {} values, {} dates and {} intervals",
                values.len(),
                dates.len(),
                intervals.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Model(
                "Forecast produced non-finite values".to_string(),
            ));
        }

        Ok(Self {
            dates,
            values,
            intervals,
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn intervals(&self) -> &[(f64, f64)] {
        &self.intervals
    }

    /// Number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.values.len()
    }

    pub fn rows(&self) -> Vec<ForecastRow> {
        self.dates
            .iter()
            .zip(&self.values)
            .zip(&self.intervals)
            .map(|((date, forecast), (lower, upper))| ForecastRow {
                date: *date,
                forecast: *forecast,
                lower: *lower,
                upper: *upper,
            })
            .collect()
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Forecast the `horizon` days after the training series ends
    fn forecast(&self, horizon: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a daily series
pub trait ForecastModel: Debug + Clone + Send + Sync {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on the whole of `series`
    fn train(&self, series: &TimeSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;

    /// Fewest observations `train` accepts
    fn min_history(&self) -> usize;
}

pub(crate) fn ensure_history(name: &str, required: usize, actual: usize) -> Result<()> {
    if actual < required {
        return Err(ForecastError::Model(format!(
            "{} needs at least {} observations, got {}",
            name, required, actual
        )));
    }
    Ok(())
}

/// Root mean square of the finite in-sample residuals (0 when there are none)
pub(crate) fn residual_sigma(residuals: &[f64]) -> f64 {
    let finite: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
    forecast_math::stats::root_mean_square(&finite).unwrap_or(0.0)
}

/// Attach dates after `end` and symmetric normal bands that widen with √h
pub(crate) fn dated_forecast(
    end: NaiveDate,
    points: Vec<f64>,
    sigma: f64,
    width: f64,
) -> Result<ForecastResult> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::Model(e.to_string()))?;
    let z = normal.inverse_cdf(0.5 + width / 2.0);

    let dates = (1..=points.len())
        .map(|k| end + Duration::days(k as i64))
        .collect();
    let intervals = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let margin = z * sigma * ((i + 1) as f64).sqrt();
            (p - margin, p + margin)
        })
        .collect();

    ForecastResult::new(dates, points, intervals)
}

pub(crate) fn ensure_horizon(horizon: usize) -> Result<()> {
    if horizon == 0 {
        return Err(ForecastError::InvalidParameter(
            "Forecast horizon must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Closed set of model families that can be searched and blended
#[derive(Debug, Clone)]
pub enum CandidateModel {
    Seasonal(SeasonalModel),
    Naive(NaiveModel),
    SeasonalNaive(SeasonalNaive),
    Drift(DriftModel),
    MovingAverage(MovingAverageModel),
    SimpleExponentialSmoothing(SimpleExponentialSmoothing),
    Holt(HoltLinear),
    HoltWinters(HoltWinters),
    Theta(ThetaModel),
    AutoRegressive(AutoRegressive),
}

/// A trained [`CandidateModel`]
#[derive(Debug, Clone)]
pub enum FittedModel {
    Seasonal(TrainedSeasonalModel),
    Naive(TrainedNaive),
    SeasonalNaive(TrainedSeasonalNaive),
    Drift(TrainedDrift),
    MovingAverage(TrainedMovingAverage),
    SimpleExponentialSmoothing(TrainedSimpleExponentialSmoothing),
    Holt(TrainedHoltLinear),
    HoltWinters(TrainedHoltWinters),
    Theta(TrainedTheta),
    AutoRegressive(TrainedAutoRegressive),
}

impl CandidateModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            CandidateModel::Seasonal(_) => ModelFamily::Seasonal,
            CandidateModel::Naive(_) => ModelFamily::Naive,
            CandidateModel::SeasonalNaive(_) => ModelFamily::SeasonalNaive,
            CandidateModel::Drift(_) => ModelFamily::Drift,
            CandidateModel::MovingAverage(_) => ModelFamily::MovingAverage,
            CandidateModel::SimpleExponentialSmoothing(_) => {
                ModelFamily::SimpleExponentialSmoothing
            }
            CandidateModel::Holt(_) => ModelFamily::Holt,
            CandidateModel::HoltWinters(_) => ModelFamily::HoltWinters,
            CandidateModel::Theta(_) => ModelFamily::Theta,
            CandidateModel::AutoRegressive(_) => ModelFamily::AutoRegressive,
        }
    }

    /// The hyperparameters this model was built from
    pub fn params(&self) -> ParamSet {
        match self {
            CandidateModel::Seasonal(m) => m.config().to_params(),
            CandidateModel::Naive(_) | CandidateModel::Drift(_) => ParamSet::new(),
            CandidateModel::SeasonalNaive(m) => ParamSet::new().with("period", m.period()),
            CandidateModel::MovingAverage(m) => ParamSet::new().with("window", m.window()),
            CandidateModel::SimpleExponentialSmoothing(m) => {
                ParamSet::new().with("alpha", m.alpha())
            }
            CandidateModel::Holt(m) => ParamSet::new()
                .with("alpha", m.alpha())
                .with("beta", m.beta()),
            CandidateModel::HoltWinters(m) => ParamSet::new()
                .with("alpha", m.alpha())
                .with("beta", m.beta())
                .with("gamma", m.gamma())
                .with("period", m.period()),
            CandidateModel::Theta(m) => ParamSet::new().with("alpha", m.alpha()),
            CandidateModel::AutoRegressive(m) => ParamSet::new().with("order", m.order()),
        }
    }
}

impl ForecastModel for CandidateModel {
    type Trained = FittedModel;

    fn train(&self, series: &TimeSeries) -> Result<FittedModel> {
        Ok(match self {
            CandidateModel::Seasonal(m) => FittedModel::Seasonal(m.train(series)?),
            CandidateModel::Naive(m) => FittedModel::Naive(m.train(series)?),
            CandidateModel::SeasonalNaive(m) => FittedModel::SeasonalNaive(m.train(series)?),
            CandidateModel::Drift(m) => FittedModel::Drift(m.train(series)?),
            CandidateModel::MovingAverage(m) => FittedModel::MovingAverage(m.train(series)?),
            CandidateModel::SimpleExponentialSmoothing(m) => {
                FittedModel::SimpleExponentialSmoothing(m.train(series)?)
            }
            CandidateModel::Holt(m) => FittedModel::Holt(m.train(series)?),
            CandidateModel::HoltWinters(m) => FittedModel::HoltWinters(m.train(series)?),
            CandidateModel::Theta(m) => FittedModel::Theta(m.train(series)?),
            CandidateModel::AutoRegressive(m) => FittedModel::AutoRegressive(m.train(series)?),
        })
    }

    fn name(&self) -> &str {
        match self {
            CandidateModel::Seasonal(m) => m.name(),
            CandidateModel::Naive(m) => m.name(),
            CandidateModel::SeasonalNaive(m) => m.name(),
            CandidateModel::Drift(m) => m.name(),
            CandidateModel::MovingAverage(m) => m.name(),
            CandidateModel::SimpleExponentialSmoothing(m) => m.name(),
            CandidateModel::Holt(m) => m.name(),
            CandidateModel::HoltWinters(m) => m.name(),
            CandidateModel::Theta(m) => m.name(),
            CandidateModel::AutoRegressive(m) => m.name(),
        }
    }

    fn min_history(&self) -> usize {
        match self {
            CandidateModel::Seasonal(m) => m.min_history(),
            CandidateModel::Naive(m) => m.min_history(),
            CandidateModel::SeasonalNaive(m) => m.min_history(),
            CandidateModel::Drift(m) => m.min_history(),
            CandidateModel::MovingAverage(m) => m.min_history(),
            CandidateModel::SimpleExponentialSmoothing(m) => m.min_history(),
            CandidateModel::Holt(m) => m.min_history(),
            CandidateModel::HoltWinters(m) => m.min_history(),
            CandidateModel::Theta(m) => m.min_history(),
            CandidateModel::AutoRegressive(m) => m.min_history(),
        }
    }
}

impl TrainedForecastModel for FittedModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        match self {
            FittedModel::Seasonal(m) => m.forecast(horizon),
            FittedModel::Naive(m) => m.forecast(horizon),
            FittedModel::SeasonalNaive(m) => m.forecast(horizon),
            FittedModel::Drift(m) => m.forecast(horizon),
            FittedModel::MovingAverage(m) => m.forecast(horizon),
            FittedModel::SimpleExponentialSmoothing(m) => m.forecast(horizon),
            FittedModel::Holt(m) => m.forecast(horizon),
            FittedModel::HoltWinters(m) => m.forecast(horizon),
            FittedModel::Theta(m) => m.forecast(horizon),
            FittedModel::AutoRegressive(m) => m.forecast(horizon),
        }
    }

    fn name(&self) -> &str {
        match self {
            FittedModel::Seasonal(m) => m.name(),
            FittedModel::Naive(m) => m.name(),
            FittedModel::SeasonalNaive(m) => m.name(),
            FittedModel::Drift(m) => m.name(),
            FittedModel::MovingAverage(m) => m.name(),
            FittedModel::SimpleExponentialSmoothing(m) => m.name(),
            FittedModel::Holt(m) => m.name(),
            FittedModel::HoltWinters(m) => m.name(),
            FittedModel::Theta(m) => m.name(),
            FittedModel::AutoRegressive(m) => m.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dated_forecast_bands_widen() {
        let end = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let result = dated_forecast(end, vec![10.0, 10.0, 10.0], 1.0, 0.8).unwrap();

        assert_eq!(result.horizons(), 3);
        assert_eq!(result.dates()[0], NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(result.dates()[2], NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());

        let (lo1, hi1) = result.intervals()[0];
        let (lo3, hi3) = result.intervals()[2];
        assert_relative_eq!(hi1 - 10.0, 1.281_551_565, epsilon = 1e-6);
        assert_relative_eq!(10.0 - lo1, hi1 - 10.0, epsilon = 1e-12);
        assert!(hi3 - lo3 > hi1 - lo1);
    }

    #[test]
    fn test_forecast_result_validates_lengths() {
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(ForecastResult::new(vec![end], vec![1.0, 2.0], vec![(0.0, 1.0)]).is_err());
        assert!(ForecastResult::new(vec![end], vec![f64::NAN], vec![(0.0, 1.0)]).is_err());
    }

    #[test]
    fn test_residual_sigma_ignores_non_finite() {
        assert_relative_eq!(residual_sigma(&[3.0, f64::NAN, -4.0]), (12.5f64).sqrt());
        assert_eq!(residual_sigma(&[]), 0.0);
    }
}
