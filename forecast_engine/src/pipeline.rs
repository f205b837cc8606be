//! Request orchestration
//!
//! One request fetches a series, runs the configured strategy through the
//! stage machine and returns a report. Any failure is returned tagged with the
//! symbol, the date range and the stage it happened in.

use crate::automl::{AutoMlEngine, AutoMlReport};
use crate::config::{DashboardConfig, SeasonalSettings, Strategy};
use crate::cv::{CrossValidator, CvReport};
use crate::data::{ComponentRow, ForecastRow, TimeSeries};
use crate::error::{RequestContext, Result};
use crate::models::seasonal::{default_search_grid, SeasonalConfig, SeasonalModel};
use crate::models::{CandidateModel, ForecastModel};
use crate::params::ParamSet;
use crate::progress::{enter_stage, LogProgress, ProgressSink};
use crate::search::{HyperparameterSearch, SearchOutcome};
use crate::source::PriceSource;
use crate::stage::{Stage, StageTracker};
use crate::trainer::{display_mape, ForecastTrainer};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct SeasonalReport {
    /// Every sampled combination with its score, in sample order
    pub search: SearchOutcome,
    pub best: ParamSet,
    pub model: String,
    /// Cross-validation of the final configuration
    pub cv: CvReport,
    /// Aggregated MAPE of `cv`, rounded for display
    pub mape: f64,
    pub forecast: Vec<ForecastRow>,
    /// Trend and seasonal breakdown of `forecast`, row for row
    pub components: Vec<ComponentRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum StrategyReport {
    SeasonalSearch(SeasonalReport),
    AutomlEnsemble(AutoMlReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Stages entered, oldest first
    pub stages: Vec<Stage>,
    pub outcome: StrategyReport,
}

impl PipelineReport {
    pub fn forecast(&self) -> &[ForecastRow] {
        match &self.outcome {
            StrategyReport::SeasonalSearch(r) => &r.forecast,
            StrategyReport::AutomlEnsemble(r) => &r.forecast,
        }
    }
}

pub struct ForecastPipeline<S> {
    source: S,
    config: DashboardConfig,
    progress: Box<dyn ProgressSink>,
}

impl<S: PriceSource> ForecastPipeline<S> {
    /// Validates `config`; progress goes to the log until replaced
    pub fn new(source: S, config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            progress: Box::new(LogProgress),
        })
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the configured symbol and forecast it
    pub fn run(&self) -> Result<PipelineReport> {
        let symbol = self.config.symbol.as_str();
        let start = self.config.start;
        let end = self.config.end_date();

        info!(symbol, %start, %end, source = self.source.name(), "fetching prices");
        let series = self.source.fetch(symbol, start, end).map_err(|e| {
            e.in_request(RequestContext {
                symbol: symbol.to_string(),
                start,
                end,
                stage: Stage::Initialized,
            })
        })?;

        self.run_on_series(&series, end)
    }

    /// Forecast an already fetched series; `end` is the exclusive end of the
    /// requested range
    pub fn run_on_series(&self, series: &TimeSeries, end: NaiveDate) -> Result<PipelineReport> {
        let mut tracker = StageTracker::new();
        info!(
            symbol = series.symbol(),
            strategy = %self.config.strategy,
            days = series.len(),
            "running forecast"
        );

        let outcome = match self.config.strategy {
            Strategy::SeasonalSearch => self
                .run_seasonal(series, &mut tracker)
                .map(StrategyReport::SeasonalSearch),
            Strategy::AutomlEnsemble => self
                .run_automl(series, &mut tracker)
                .map(StrategyReport::AutomlEnsemble),
        };

        let outcome = outcome.map_err(|e| {
            e.in_request(RequestContext {
                symbol: series.symbol().to_string(),
                start: self.config.start,
                end,
                stage: tracker.current(),
            })
        })?;

        Ok(PipelineReport {
            symbol: series.symbol().to_string(),
            start: self.config.start,
            end,
            stages: tracker.history().to_vec(),
            outcome,
        })
    }

    fn run_seasonal(&self, series: &TimeSeries, tracker: &mut StageTracker) -> Result<SeasonalReport> {
        let settings: &SeasonalSettings = &self.config.seasonal;
        let progress = self.progress.as_ref();
        let cv = settings.cv_config()?;

        enter_stage(tracker, Stage::Searching, progress)?;
        let validator = CrossValidator::new(cv)
            .with_aggregation(settings.aggregation)
            .with_stage(Stage::Searching);
        let search = HyperparameterSearch::new(default_search_grid(), settings.trial_bound)?
            .with_seed(settings.seed);
        let outcome = search.run(
            series,
            &validator,
            |params| {
                let config = SeasonalConfig::default()
                    .with_params(params)?
                    .with_country_holidays(settings.country.clone())
                    .with_seed(settings.seed);
                Ok(CandidateModel::Seasonal(SeasonalModel::new(config)?))
            },
            progress,
        )?;
        let best = outcome.best_params().clone();

        enter_stage(tracker, Stage::Finalizing, progress)?;
        let trainer = ForecastTrainer::for_selection(&best, settings.country.clone(), settings.seed)?;
        let fitted = trainer.fit(series)?;
        let final_validator = CrossValidator::new(cv)
            .with_aggregation(settings.aggregation)
            .with_execution(settings.execution_mode())
            .with_stage(Stage::Finalizing);
        let report = trainer.evaluate(series, &final_validator)?;
        let mape = display_mape(&report);
        info!(model = trainer.model().name(), mape, "final model cross-validated");

        enter_stage(tracker, Stage::Forecasting, progress)?;
        let forecast = fitted.forecast(settings.future_period_days)?;
        let components = fitted.components(settings.future_period_days)?;

        Ok(SeasonalReport {
            search: outcome,
            best,
            model: trainer.model().name().to_string(),
            cv: report,
            mape,
            forecast,
            components,
        })
    }

    fn run_automl(&self, series: &TimeSeries, tracker: &mut StageTracker) -> Result<AutoMlReport> {
        let engine = AutoMlEngine::new(self.config.automl.engine_config())?;
        engine.run(series, tracker, self.progress.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutionKind, Strategy};
    use crate::error::ForecastError;
    use crate::progress::{ProgressEvent, RecordingProgress};
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct MemorySource {
        days: usize,
    }

    impl PriceSource for MemorySource {
        fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
            if symbol == "MISSING.NS" {
                return Err(ForecastError::DataUnavailable {
                    symbol: symbol.to_string(),
                    start,
                    end,
                    reason: "delisted".to_string(),
                });
            }
            let values = (0..self.days)
                .map(|i| 300.0 + i as f64 * 0.3 + 4.0 * ((i % 7) as f64 - 3.0).abs())
                .collect();
            TimeSeries::new(symbol, start, values)
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    struct SharedProgress(Arc<RecordingProgress>);

    impl ProgressSink for SharedProgress {
        fn notify(&self, event: &ProgressEvent) {
            self.0.notify(event)
        }
    }

    fn config(strategy: Strategy) -> DashboardConfig {
        let mut config = DashboardConfig {
            symbol: "SBIN.NS".to_string(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31),
            strategy,
            ..DashboardConfig::default()
        };
        config.seasonal.initial_days = 60;
        config.seasonal.trial_bound = 3;
        config.seasonal.workers = 2;
        config.automl.tuning_trials = 2;
        config
    }

    #[test]
    fn test_seasonal_flow() {
        let recorder = Arc::new(RecordingProgress::new());
        let pipeline = ForecastPipeline::new(MemorySource { days: 120 }, config(Strategy::SeasonalSearch))
            .unwrap()
            .with_progress(Box::new(SharedProgress(Arc::clone(&recorder))));

        let report = pipeline.run().unwrap();

        assert_eq!(
            report.stages,
            vec![Stage::Initialized, Stage::Searching, Stage::Finalizing, Stage::Forecasting]
        );
        let StrategyReport::SeasonalSearch(seasonal) = &report.outcome else {
            panic!("expected a seasonal report");
        };
        assert_eq!(seasonal.search.trials.len(), 3);
        assert!(seasonal
            .search
            .trials
            .iter()
            .filter(|t| t.is_scored())
            .all(|t| seasonal.search.best().score <= t.score));
        assert_eq!(report.forecast().len(), 7);
        assert_eq!(
            report.forecast()[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(120)
        );

        let trials = recorder
            .events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::TrialScored { .. }))
            .count();
        assert_eq!(trials, 3);
    }

    #[test]
    fn test_sequential_and_parallel_final_cv_agree() {
        let mut sequential = config(Strategy::SeasonalSearch);
        sequential.seasonal.execution = ExecutionKind::Sequential;
        let parallel = config(Strategy::SeasonalSearch);

        let a = ForecastPipeline::new(MemorySource { days: 100 }, sequential)
            .unwrap()
            .run()
            .unwrap();
        let b = ForecastPipeline::new(MemorySource { days: 100 }, parallel)
            .unwrap()
            .run()
            .unwrap();

        let (StrategyReport::SeasonalSearch(a), StrategyReport::SeasonalSearch(b)) =
            (&a.outcome, &b.outcome)
        else {
            panic!("expected seasonal reports");
        };
        assert_eq!(a.cv, b.cv);
    }

    #[test]
    fn test_automl_flow() {
        let pipeline =
            ForecastPipeline::new(MemorySource { days: 90 }, config(Strategy::AutomlEnsemble)).unwrap();
        let report = pipeline.run().unwrap();

        assert_eq!(
            report.stages,
            vec![
                Stage::Initialized,
                Stage::Comparing,
                Stage::Tuning,
                Stage::Finalizing,
                Stage::Forecasting
            ]
        );
        assert_eq!(report.forecast().len(), 5);
    }

    #[test]
    fn test_fetch_failure_names_request() {
        let mut config = config(Strategy::SeasonalSearch);
        config.symbol = "MISSING.NS".to_string();
        let err = ForecastPipeline::new(MemorySource { days: 10 }, config)
            .unwrap()
            .run()
            .unwrap_err();

        let context = err.context().unwrap();
        assert_eq!(context.symbol, "MISSING.NS");
        assert_eq!(context.stage, Stage::Initialized);
        assert!(matches!(err.root(), ForecastError::DataUnavailable { .. }));
        assert!(err.to_string().starts_with("MISSING.NS [2024-01-01 .. 2024-12-31]"));
    }

    #[test]
    fn test_short_history_fails_in_search_stage() {
        let err = ForecastPipeline::new(MemorySource { days: 50 }, config(Strategy::SeasonalSearch))
            .unwrap()
            .run()
            .unwrap_err();

        assert_eq!(err.context().unwrap().stage, Stage::Searching);
        assert!(matches!(
            err.root(),
            ForecastError::InsufficientHistory {
                stage: Stage::Searching,
                required: 67,
                actual: 50
            }
        ));
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let mut config = config(Strategy::AutomlEnsemble);
        config.automl.horizon = 0;
        assert!(ForecastPipeline::new(MemorySource { days: 10 }, config).is_err());
    }
}
