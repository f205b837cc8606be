//! Combining the forecasts of several tuned models

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{CandidateModel, FittedModel, ForecastModel, ForecastResult, TrainedForecastModel};
use crate::stage::Stage;
use forecast_math::stats::{geometric_mean, mean, median};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Step-wise rule for blending member forecasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendRule {
    #[default]
    #[serde(rename = "gmean")]
    GeometricMean,
    #[serde(rename = "mean")]
    Mean,
    #[serde(rename = "median")]
    Median,
}

impl BlendRule {
    /// Blend one step's member values. Geometric blending refuses
    /// non-positive values instead of replacing them.
    pub fn combine(&self, values: &[f64], stage: Stage) -> Result<f64> {
        let blended = match self {
            BlendRule::GeometricMean => geometric_mean(values),
            BlendRule::Mean => mean(values),
            BlendRule::Median => median(values),
        };
        blended.map_err(|e| ForecastError::SelectionFailure {
            stage,
            reason: format!("{} blend failed: {}", self, e),
        })
    }
}

impl fmt::Display for BlendRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlendRule::GeometricMean => f.write_str("gmean"),
            BlendRule::Mean => f.write_str("mean"),
            BlendRule::Median => f.write_str("median"),
        }
    }
}

impl FromStr for BlendRule {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gmean" | "geometric" => Ok(BlendRule::GeometricMean),
            "mean" => Ok(BlendRule::Mean),
            "median" => Ok(BlendRule::Median),
            other => Err(ForecastError::Configuration(format!(
                "Unknown blend rule '{}' (expected gmean, mean or median)",
                other
            ))),
        }
    }
}

/// Tuned models that forecast together
#[derive(Debug, Clone)]
pub struct Ensemble {
    members: Vec<CandidateModel>,
    rule: BlendRule,
    name: String,
}

impl Ensemble {
    pub fn new(members: Vec<CandidateModel>, rule: BlendRule) -> Result<Self> {
        if members.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "An ensemble needs at least one member".to_string(),
            ));
        }
        let names: Vec<&str> = members.iter().map(|m| m.name()).collect();
        let name = format!("Blend[{}]({})", rule, names.join(", "));

        Ok(Self {
            members,
            rule,
            name,
        })
    }

    pub fn members(&self) -> &[CandidateModel] {
        &self.members
    }

    pub fn rule(&self) -> BlendRule {
        self.rule
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fit every member on `series`; blend failures report `stage`
    pub fn fit(&self, series: &TimeSeries, stage: Stage) -> Result<FittedEnsemble> {
        let members = self
            .members
            .iter()
            .map(|m| m.train(series))
            .collect::<Result<Vec<_>>>()?;

        Ok(FittedEnsemble {
            members,
            rule: self.rule,
            name: self.name.clone(),
            stage,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FittedEnsemble {
    members: Vec<FittedModel>,
    rule: BlendRule,
    name: String,
    stage: Stage,
}

impl TrainedForecastModel for FittedEnsemble {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let forecasts = self
            .members
            .iter()
            .map(|m| m.forecast(horizon))
            .collect::<Result<Vec<_>>>()?;

        let dates = forecasts[0].dates().to_vec();
        let mut values = Vec::with_capacity(horizon);
        let mut intervals = Vec::with_capacity(horizon);
        for step in 0..horizon {
            let points: Vec<f64> = forecasts.iter().map(|f| f.values()[step]).collect();
            let lowers: Vec<f64> = forecasts.iter().map(|f| f.intervals()[step].0).collect();
            let uppers: Vec<f64> = forecasts.iter().map(|f| f.intervals()[step].1).collect();

            values.push(self.rule.combine(&points, self.stage)?);
            intervals.push((
                self.rule.combine(&lowers, self.stage)?,
                self.rule.combine(&uppers, self.stage)?,
            ));
        }

        ForecastResult::new(dates, values, intervals)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DriftModel, NaiveModel};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rstest::rstest;

    #[rstest]
    #[case(BlendRule::GeometricMean, 2.884_499_140_614_817)]
    #[case(BlendRule::Mean, 5.0)]
    #[case(BlendRule::Median, 2.0)]
    fn test_blend_rules(#[case] rule: BlendRule, #[case] expected: f64) {
        let blended = rule.combine(&[1.0, 2.0, 12.0], Stage::Tuning).unwrap();
        assert_relative_eq!(blended, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_geometric_blend_rejects_non_positive() {
        let err = BlendRule::GeometricMean
            .combine(&[3.0, -1.0], Stage::Forecasting)
            .unwrap_err();
        assert!(matches!(
            err,
            ForecastError::SelectionFailure {
                stage: Stage::Forecasting,
                ..
            }
        ));
        assert!(BlendRule::Mean.combine(&[3.0, -1.0], Stage::Forecasting).is_ok());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("gmean".parse::<BlendRule>().unwrap(), BlendRule::GeometricMean);
        assert_eq!("Median".parse::<BlendRule>().unwrap(), BlendRule::Median);
        assert!("max".parse::<BlendRule>().is_err());
        assert_eq!(BlendRule::default().to_string(), "gmean");
    }

    #[test]
    fn test_ensemble_blends_members() {
        let series = TimeSeries::new(
            "ENS",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec![10.0, 11.0, 12.0, 13.0],
        )
        .unwrap();
        let ensemble = Ensemble::new(
            vec![
                CandidateModel::Naive(NaiveModel::new()),
                CandidateModel::Drift(DriftModel::new()),
            ],
            BlendRule::Mean,
        )
        .unwrap();

        let forecast = ensemble.fit(&series, Stage::Finalizing).unwrap().forecast(2).unwrap();
        // naive says 13, drift says 14 then 15
        assert_relative_eq!(forecast.values()[0], 13.5);
        assert_relative_eq!(forecast.values()[1], 14.0);
        assert!(Ensemble::new(vec![], BlendRule::Mean).is_err());
    }
}
