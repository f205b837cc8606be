//! Model families: labels, default configurations and tuning grids

use crate::error::{ForecastError, Result};
use crate::models::seasonal::{default_search_grid, SeasonalConfig, SeasonalModel};
use crate::models::{
    AutoRegressive, CandidateModel, DriftModel, HoltLinear, HoltWinters, MovingAverageModel,
    NaiveModel, SeasonalNaive, SimpleExponentialSmoothing, ThetaModel,
};
use crate::params::{ParamSet, ParameterGrid};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weekly cycle of a calendar-day series
pub const WEEKLY_PERIOD: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Seasonal,
    Naive,
    SeasonalNaive,
    Drift,
    MovingAverage,
    SimpleExponentialSmoothing,
    Holt,
    HoltWinters,
    Theta,
    AutoRegressive,
}

impl ModelFamily {
    /// Families compared by the model selection engine, in report order
    pub const PANEL: [ModelFamily; 9] = [
        ModelFamily::Naive,
        ModelFamily::SeasonalNaive,
        ModelFamily::Drift,
        ModelFamily::MovingAverage,
        ModelFamily::SimpleExponentialSmoothing,
        ModelFamily::Holt,
        ModelFamily::HoltWinters,
        ModelFamily::Theta,
        ModelFamily::AutoRegressive,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ModelFamily::Seasonal => "Seasonal",
            ModelFamily::Naive => "Naive",
            ModelFamily::SeasonalNaive => "Seasonal Naive",
            ModelFamily::Drift => "Drift",
            ModelFamily::MovingAverage => "Moving Average",
            ModelFamily::SimpleExponentialSmoothing => "Exponential Smoothing",
            ModelFamily::Holt => "Holt Linear",
            ModelFamily::HoltWinters => "Holt-Winters Additive",
            ModelFamily::Theta => "Theta",
            ModelFamily::AutoRegressive => "Autoregressive",
        }
    }

    /// Configuration used when families are compared before tuning
    pub fn default_params(&self) -> ParamSet {
        match self {
            ModelFamily::Seasonal => SeasonalConfig::default().to_params(),
            ModelFamily::Naive | ModelFamily::Drift => ParamSet::new(),
            ModelFamily::SeasonalNaive => ParamSet::new().with("period", WEEKLY_PERIOD),
            ModelFamily::MovingAverage => ParamSet::new().with("window", 7_usize),
            ModelFamily::SimpleExponentialSmoothing => ParamSet::new().with("alpha", 0.3),
            ModelFamily::Holt => ParamSet::new().with("alpha", 0.3).with("beta", 0.1),
            ModelFamily::HoltWinters => ParamSet::new()
                .with("alpha", 0.3)
                .with("beta", 0.05)
                .with("gamma", 0.1)
                .with("period", WEEKLY_PERIOD),
            ModelFamily::Theta => ParamSet::new().with("alpha", 0.5),
            ModelFamily::AutoRegressive => ParamSet::new().with("order", 3_usize),
        }
    }

    /// Discrete grid searched when the family is tuned
    pub fn grid(&self) -> ParameterGrid {
        let unit = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
        match self {
            ModelFamily::Seasonal => default_search_grid(),
            ModelFamily::Naive | ModelFamily::Drift => ParameterGrid::new(),
            ModelFamily::SeasonalNaive => {
                ParameterGrid::new().with_axis("period", vec![7_usize, 14, 30])
            }
            ModelFamily::MovingAverage => {
                ParameterGrid::new().with_axis("window", vec![3_usize, 5, 7, 10, 14, 21, 30])
            }
            ModelFamily::SimpleExponentialSmoothing | ModelFamily::Theta => {
                ParameterGrid::new().with_axis("alpha", unit)
            }
            ModelFamily::Holt => ParameterGrid::new()
                .with_axis("alpha", vec![0.1, 0.3, 0.5, 0.7, 0.9])
                .with_axis("beta", vec![0.01, 0.05, 0.1, 0.2, 0.3]),
            ModelFamily::HoltWinters => ParameterGrid::new()
                .with_axis("alpha", vec![0.1, 0.3, 0.5, 0.7])
                .with_axis("beta", vec![0.01, 0.05, 0.1])
                .with_axis("gamma", vec![0.05, 0.1, 0.3])
                .with_axis("period", vec![WEEKLY_PERIOD]),
            ModelFamily::AutoRegressive => {
                ParameterGrid::new().with_axis("order", vec![1_usize, 2, 3, 5, 7, 10, 14])
            }
        }
    }

    /// Build a model of this family; parameters missing from `params` take
    /// the family defaults
    pub fn build(&self, params: &ParamSet) -> Result<CandidateModel> {
        let defaults = self.default_params();
        let f = |name: &str| -> Result<f64> {
            let fallback = defaults.f64_or(name, f64::NAN)?;
            params.f64_or(name, fallback)
        };
        let u = |name: &str| -> Result<usize> {
            let fallback = defaults.usize_or(name, 0)?;
            params.usize_or(name, fallback)
        };

        Ok(match self {
            ModelFamily::Seasonal => CandidateModel::Seasonal(SeasonalModel::new(
                SeasonalConfig::default().with_params(params)?,
            )?),
            ModelFamily::Naive => CandidateModel::Naive(NaiveModel::new()),
            ModelFamily::SeasonalNaive => {
                CandidateModel::SeasonalNaive(SeasonalNaive::new(u("period")?)?)
            }
            ModelFamily::Drift => CandidateModel::Drift(DriftModel::new()),
            ModelFamily::MovingAverage => {
                CandidateModel::MovingAverage(MovingAverageModel::new(u("window")?)?)
            }
            ModelFamily::SimpleExponentialSmoothing => CandidateModel::SimpleExponentialSmoothing(
                SimpleExponentialSmoothing::new(f("alpha")?)?,
            ),
            ModelFamily::Holt => CandidateModel::Holt(HoltLinear::new(f("alpha")?, f("beta")?)?),
            ModelFamily::HoltWinters => CandidateModel::HoltWinters(HoltWinters::new(
                f("alpha")?,
                f("beta")?,
                f("gamma")?,
                u("period")?,
            )?),
            ModelFamily::Theta => CandidateModel::Theta(ThetaModel::new(f("alpha")?)?),
            ModelFamily::AutoRegressive => {
                CandidateModel::AutoRegressive(AutoRegressive::new(u("order")?)?)
            }
        })
    }

    pub fn default_model(&self) -> Result<CandidateModel> {
        self.build(&ParamSet::new())
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ModelFamily {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ModelFamily::PANEL
            .iter()
            .chain(std::iter::once(&ModelFamily::Seasonal))
            .find(|family| family.label().to_ascii_lowercase() == wanted)
            .copied()
            .ok_or_else(|| ForecastError::InvalidParameter(format!("Unknown model family '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForecastModel;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_family_builds_from_defaults_and_grid() {
        for family in ModelFamily::PANEL.iter().chain([ModelFamily::Seasonal].iter()) {
            let model = family.default_model().unwrap();
            assert_eq!(model.family(), *family);
            assert_eq!(model.params(), family.default_params());

            let grid = family.grid();
            grid.validate().unwrap();
            for combo in grid.combinations().iter().take(5) {
                let built = family.build(combo).unwrap();
                assert_eq!(built.family(), *family);
            }
        }
    }

    #[test]
    fn test_build_overrides_defaults() {
        let model = ModelFamily::Holt
            .build(&ParamSet::new().with("alpha", 0.9))
            .unwrap();
        assert_eq!(model.params(), ParamSet::new().with("alpha", 0.9).with("beta", 0.1));
        assert_eq!(model.name(), "Holt Linear (alpha=0.9, beta=0.1)");
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        assert!(ModelFamily::MovingAverage
            .build(&ParamSet::new().with("window", "wide"))
            .is_err());
        assert!(ModelFamily::Theta.build(&ParamSet::new().with("alpha", 1.5)).is_err());
    }

    #[test]
    fn test_parse_label() {
        assert_eq!("holt-winters additive".parse::<ModelFamily>().unwrap(), ModelFamily::HoltWinters);
        assert!("prophet".parse::<ModelFamily>().is_err());
    }
}
