//! Final fit of the chosen seasonal configuration

use crate::cv::{CrossValidator, CvReport};
use crate::data::{ComponentRow, ForecastRow, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::metrics::round_to;
use crate::models::seasonal::{SeasonalConfig, SeasonalModel, TrainedSeasonalModel};
use crate::models::{ForecastModel, TrainedForecastModel};
use crate::params::ParamSet;
use tracing::info;

/// Changepoints may sit anywhere in the first 90% of history for the final model
pub const FINAL_CHANGEPOINT_RANGE: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct ForecastTrainer {
    model: SeasonalModel,
}

impl ForecastTrainer {
    pub fn new(config: SeasonalConfig) -> Result<Self> {
        Ok(Self {
            model: SeasonalModel::new(config)?,
        })
    }

    /// Final configuration for the combination a search selected
    pub fn for_selection(best: &ParamSet, country: Option<String>, seed: u64) -> Result<Self> {
        let config = SeasonalConfig::default()
            .with_params(best)?
            .with_changepoint_range(FINAL_CHANGEPOINT_RANGE)
            .with_country_holidays(country)
            .with_seed(seed);
        Self::new(config)
    }

    pub fn model(&self) -> &SeasonalModel {
        &self.model
    }

    /// Fit on the entire series, no holdout
    pub fn fit(&self, series: &TimeSeries) -> Result<FittedForecaster> {
        let trained = self.model.train(series)?;
        info!(model = self.model.name(), observations = series.len(), "final model fitted");
        Ok(FittedForecaster { trained })
    }

    /// Cross-validate the final configuration
    pub fn evaluate(&self, series: &TimeSeries, validator: &CrossValidator) -> Result<CvReport> {
        validator.evaluate(&self.model, series)
    }
}

/// MAPE as shown to the user
pub fn display_mape(report: &CvReport) -> f64 {
    round_to(report.score(), 3)
}

#[derive(Debug, Clone)]
pub struct FittedForecaster {
    trained: TrainedSeasonalModel,
}

impl FittedForecaster {
    /// `periods` rows starting the day after the last observation
    pub fn forecast(&self, periods: usize) -> Result<Vec<ForecastRow>> {
        check_periods(periods)?;
        Ok(self.trained.forecast(periods)?.rows())
    }

    /// Trend, weekly, yearly and holiday parts of the same `periods` rows
    pub fn components(&self, periods: usize) -> Result<Vec<ComponentRow>> {
        check_periods(periods)?;
        self.trained.components(periods)
    }
}

fn check_periods(periods: usize) -> Result<()> {
    if periods == 0 {
        return Err(ForecastError::InvalidParameter(
            "Number of future periods must be at least 1".to_string(),
        ));
    }
    Ok(())
}
