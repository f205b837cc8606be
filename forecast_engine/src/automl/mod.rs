//! Automated model selection
//!
//! Holds out the last `holdout_horizon` days, compares the candidate panel by
//! cross-validation on the rest, tunes the best few, blends them and refits
//! the blend on the whole series.

pub mod blend;

pub use blend::{BlendRule, Ensemble, FittedEnsemble};

use crate::cv::{CrossValidator, CvConfig, ExecutionMode, MetricAggregation};
use crate::data::{ForecastRow, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate_forecast, ForecastMetrics};
use crate::models::{CandidateModel, ForecastModel, ModelFamily, TrainedForecastModel};
use crate::params::ParamSet;
use crate::progress::{enter_stage, ProgressEvent, ProgressSink};
use crate::search::HyperparameterSearch;
use crate::stage::{Stage, StageTracker};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{info, warn};

/// Shortest training prefix any fold may use
pub const MIN_TRAIN: usize = 14;

/// Longest forecast the engine will produce
pub const MAX_FORECAST_HORIZON: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct AutoMlConfig {
    /// Days held out for scoring the blend; also the CV test window and step
    pub holdout_horizon: usize,
    pub forecast_horizon: usize,
    pub fold_count: usize,
    pub ensemble_size: usize,
    pub blend_rule: BlendRule,
    pub tuning_trials: usize,
    pub seed: u64,
    pub execution: ExecutionMode,
}

impl Default for AutoMlConfig {
    fn default() -> Self {
        Self {
            holdout_horizon: 5,
            forecast_horizon: 5,
            fold_count: 5,
            ensemble_size: 3,
            blend_rule: BlendRule::default(),
            tuning_trials: 10,
            seed: 42,
            execution: ExecutionMode::Sequential,
        }
    }
}

impl AutoMlConfig {
    /// `fold_count * fh + fh + MIN_TRAIN`
    pub fn required_length(&self) -> usize {
        self.fold_count * self.holdout_horizon + self.holdout_horizon + MIN_TRAIN
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_FORECAST_HORIZON).contains(&self.forecast_horizon) {
            return Err(ForecastError::Configuration(format!(
                "Forecast horizon must be within 1..={}, got {}",
                MAX_FORECAST_HORIZON, self.forecast_horizon
            )));
        }
        if !(1..=MAX_FORECAST_HORIZON).contains(&self.holdout_horizon) {
            return Err(ForecastError::Configuration(format!(
                "Holdout horizon must be within 1..={}, got {}",
                MAX_FORECAST_HORIZON, self.holdout_horizon
            )));
        }
        for (name, value) in [
            ("fold_count", self.fold_count),
            ("ensemble_size", self.ensemble_size),
            ("tuning_trials", self.tuning_trials),
        ] {
            if value == 0 {
                return Err(ForecastError::Configuration(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// A panel family's cross-validated default configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub family: ModelFamily,
    pub model: String,
    pub params: ParamSet,
    pub metrics: ForecastMetrics,
}

impl CandidateScore {
    pub fn score(&self) -> f64 {
        self.metrics.mape
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TunedCandidate {
    pub family: ModelFamily,
    pub params: ParamSet,
    /// Score of the untuned default on the same folds
    pub baseline_score: f64,
    pub tuned_score: f64,
    #[serde(skip)]
    pub model: CandidateModel,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoMlReport {
    /// Every family that produced a finite score, best first
    pub comparison: Vec<CandidateScore>,
    pub tuned: Vec<TunedCandidate>,
    pub ensemble: String,
    pub holdout: ForecastMetrics,
    pub forecast: Vec<ForecastRow>,
}

#[derive(Debug, Clone)]
pub struct AutoMlEngine {
    config: AutoMlConfig,
}

impl AutoMlEngine {
    pub fn new(config: AutoMlConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AutoMlConfig {
        &self.config
    }

    /// Expanding-window folds over a training prefix of `train_len` days,
    /// the last one ending where the holdout starts
    pub fn validator_for(&self, train_len: usize) -> Result<CrossValidator> {
        let fh = self.config.holdout_horizon;
        let span = self.config.fold_count * fh;
        let initial = train_len.saturating_sub(span).max(1);

        Ok(CrossValidator::new(CvConfig::new(initial, fh, fh)?)
            .with_aggregation(MetricAggregation::MeanAcrossFolds)
            .with_execution(self.config.execution)
            .with_stage(Stage::Comparing))
    }

    /// Score every panel family's default configuration; best first
    pub fn compare(
        &self,
        train: &TimeSeries,
        validator: &CrossValidator,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<CandidateScore>> {
        let mut scored = Vec::with_capacity(ModelFamily::PANEL.len());
        for family in ModelFamily::PANEL {
            let model = family.default_model()?;
            match validator.evaluate(&model, train) {
                Ok(report) if report.score().is_finite() => {
                    progress.notify(&ProgressEvent::CandidateScored {
                        model: model.name().to_string(),
                        score: report.score(),
                    });
                    scored.push(CandidateScore {
                        family,
                        model: model.name().to_string(),
                        params: model.params(),
                        metrics: report.metrics,
                    });
                }
                Ok(_) => warn!(%family, "candidate produced no finite score"),
                Err(e) => warn!(%family, error = %e, "candidate failed"),
            }
        }

        if scored.is_empty() {
            return Err(ForecastError::SelectionFailure {
                stage: validator.stage(),
                reason: "no candidate family produced a finite score".to_string(),
            });
        }

        scored.sort_by(|a, b| a.score().partial_cmp(&b.score()).unwrap_or(Ordering::Equal));
        Ok(scored)
    }

    /// Search each shortlisted family's grid; a family keeps its default
    /// configuration unless tuning strictly beats it
    pub fn tune(
        &self,
        train: &TimeSeries,
        validator: &CrossValidator,
        shortlist: &[CandidateScore],
        progress: &dyn ProgressSink,
    ) -> Result<Vec<TunedCandidate>> {
        let mut tuned = Vec::with_capacity(shortlist.len());
        for candidate in shortlist {
            let family = candidate.family;
            let search = HyperparameterSearch::new(family.grid(), self.config.tuning_trials)?
                .with_seed(self.config.seed);

            let (params, tuned_score) =
                match search.run(train, validator, |p| family.build(p), progress) {
                    Ok(outcome) if outcome.best().score < candidate.score() => {
                        (outcome.best_params().clone(), outcome.best().score)
                    }
                    Ok(_) => (candidate.params.clone(), candidate.score()),
                    Err(e @ ForecastError::SelectionFailure { .. }) => {
                        warn!(%family, error = %e, "tuning found nothing, keeping defaults");
                        (candidate.params.clone(), candidate.score())
                    }
                    Err(e) => return Err(e),
                };

            info!(%family, %params, score = tuned_score, "candidate tuned");
            tuned.push(TunedCandidate {
                family,
                model: family.build(&params)?,
                params,
                baseline_score: candidate.score(),
                tuned_score,
            });
        }
        Ok(tuned)
    }

    /// Full selection run. `tracker` must be in `Initialized`; it ends in
    /// `Forecasting` on success.
    pub fn run(
        &self,
        series: &TimeSeries,
        tracker: &mut StageTracker,
        progress: &dyn ProgressSink,
    ) -> Result<AutoMlReport> {
        let required = self.config.required_length();
        if series.len() < required {
            return Err(ForecastError::InsufficientHistory {
                stage: tracker.current(),
                required,
                actual: series.len(),
            });
        }

        let fh = self.config.holdout_horizon;
        let train = series.head(series.len() - fh)?;
        let holdout = series.window(train.len()..series.len());
        let validator = self.validator_for(train.len())?;

        enter_stage(tracker, Stage::Comparing, progress)?;
        let comparison = self.compare(&train, &validator, progress)?;
        let shortlist = &comparison[..self.config.ensemble_size.min(comparison.len())];

        enter_stage(tracker, Stage::Tuning, progress)?;
        let tuned = self.tune(&train, &validator.with_stage(Stage::Tuning), shortlist, progress)?;

        let ensemble = Ensemble::new(
            tuned.iter().map(|t| t.model.clone()).collect(),
            self.config.blend_rule,
        )?;
        let holdout_forecast = ensemble.fit(&train, Stage::Tuning)?.forecast(fh)?;
        let holdout_metrics = evaluate_forecast(holdout, holdout_forecast.values())?;
        info!(ensemble = ensemble.name(), mape = holdout_metrics.mape, "ensemble scored on holdout");

        enter_stage(tracker, Stage::Finalizing, progress)?;
        let fitted = ensemble.fit(series, Stage::Finalizing)?;

        enter_stage(tracker, Stage::Forecasting, progress)?;
        let forecast = fitted.forecast(self.config.forecast_horizon)?.rows();

        Ok(AutoMlReport {
            comparison,
            tuned,
            ensemble: ensemble.name().to_string(),
            holdout: holdout_metrics,
            forecast,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NoProgress, RecordingProgress};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn series(len: usize) -> TimeSeries {
        let values = (0..len)
            .map(|i| 100.0 + i as f64 * 0.4 + 2.0 * ((i % 7) as f64 - 3.0).abs())
            .collect();
        TimeSeries::new("AUTO.NS", NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(), values).unwrap()
    }

    fn quick_config() -> AutoMlConfig {
        AutoMlConfig {
            tuning_trials: 3,
            ..AutoMlConfig::default()
        }
    }

    #[test]
    fn test_required_length() {
        assert_eq!(AutoMlConfig::default().required_length(), 5 * 5 + 5 + 14);
    }

    #[test]
    fn test_config_bounds() {
        let mut config = AutoMlConfig::default();
        config.forecast_horizon = 61;
        assert!(AutoMlEngine::new(config.clone()).is_err());
        config.forecast_horizon = 60;
        config.ensemble_size = 0;
        assert!(AutoMlEngine::new(config).is_err());
    }

    #[test]
    fn test_short_series_fails_before_fitting() {
        let engine = AutoMlEngine::new(AutoMlConfig::default()).unwrap();
        let mut tracker = StageTracker::new();
        let err = engine.run(&series(43), &mut tracker, &NoProgress).unwrap_err();

        assert!(matches!(
            err,
            ForecastError::InsufficientHistory {
                stage: Stage::Initialized,
                required: 44,
                actual: 43
            }
        ));
        assert_eq!(tracker.history(), &[Stage::Initialized]);
    }

    #[test]
    fn test_validator_folds_end_at_holdout() {
        let engine = AutoMlEngine::new(AutoMlConfig::default()).unwrap();
        let train = series(80);
        let validator = engine.validator_for(train.len()).unwrap();
        let folds = validator.folds(&train).unwrap();

        assert_eq!(folds.len(), 5);
        assert_eq!(folds[0].test_start, 55);
        assert_eq!(folds[4].test_end, 80);
    }

    #[test]
    fn test_run_produces_blend_and_forecast() {
        let engine = AutoMlEngine::new(quick_config()).unwrap();
        let mut tracker = StageTracker::new();
        let progress = RecordingProgress::new();
        let data = series(120);

        let report = engine.run(&data, &mut tracker, &progress).unwrap();

        assert!(!report.comparison.is_empty());
        assert!(report
            .comparison
            .windows(2)
            .all(|w| w[0].score() <= w[1].score()));
        assert_eq!(report.tuned.len(), 3);
        for t in &report.tuned {
            assert!(t.tuned_score <= t.baseline_score);
        }
        assert_eq!(report.forecast.len(), 5);
        assert_eq!(
            report.forecast[0].date,
            data.end() + chrono::Duration::days(1)
        );
        assert!(report.holdout.is_finite());
    }

    #[test]
    fn test_tuning_precedes_final_refit() {
        let engine = AutoMlEngine::new(quick_config()).unwrap();
        let mut tracker = StageTracker::new();
        let progress = RecordingProgress::new();
        engine.run(&series(90), &mut tracker, &progress).unwrap();

        assert_eq!(
            tracker.history(),
            &[
                Stage::Initialized,
                Stage::Comparing,
                Stage::Tuning,
                Stage::Finalizing,
                Stage::Forecasting
            ]
        );
        let stages: Vec<Stage> = progress
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::StageEntered(stage) => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec![Stage::Comparing, Stage::Tuning, Stage::Finalizing, Stage::Forecasting]
        );
    }

    #[test]
    fn test_geometric_blend_of_negative_series_fails() {
        let values = (0..60).map(|i| -50.0 - i as f64).collect();
        let data = TimeSeries::new("NEG", NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), values)
            .unwrap();
        let engine = AutoMlEngine::new(quick_config()).unwrap();
        let err = engine
            .run(&data, &mut StageTracker::new(), &NoProgress)
            .unwrap_err();

        assert!(matches!(err, ForecastError::SelectionFailure { .. }));
    }
}
