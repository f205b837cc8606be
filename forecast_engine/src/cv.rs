//! Rolling-origin cross-validation
//!
//! The first test window starts right after `initial` days and each later
//! window starts `period` days further on, for as long as a full `horizon`
//! window fits. Every fold trains on all observations before its test window.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate_forecast, ForecastMetrics};
use crate::models::{ForecastModel, TrainedForecastModel};
use crate::stage::Stage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Window lengths in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvConfig {
    pub initial: usize,
    pub period: usize,
    pub horizon: usize,
}

impl CvConfig {
    pub fn new(initial: usize, period: usize, horizon: usize) -> Result<Self> {
        let config = Self {
            initial,
            period,
            horizon,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial == 0 || self.period == 0 || self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Cross-validation windows must be positive (initial={}, period={}, horizon={})",
                self.initial, self.period, self.horizon
            )));
        }
        Ok(())
    }

    /// Shortest series that yields one fold
    pub fn min_length(&self) -> usize {
        self.initial + self.horizon
    }

    /// `floor((len - initial - horizon) / period) + 1`, or 0 when too short
    pub fn fold_count(&self, len: usize) -> usize {
        if len < self.min_length() {
            0
        } else {
            (len - self.min_length()) / self.period + 1
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    /// Exclusive end of the training prefix; equals `test_start`
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
    /// Date of the last training observation
    pub cutoff: NaiveDate,
}

/// How fold scores are reduced to one number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricAggregation {
    /// Only the most recent fold counts
    #[default]
    LatestFold,
    MeanAcrossFolds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// Folds run on a dedicated thread pool; the collector waits at most
    /// `fold_timeout` for each result
    Parallel {
        workers: usize,
        fold_timeout: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldScore {
    pub fold: usize,
    pub cutoff: NaiveDate,
    pub metrics: ForecastMetrics,
}

/// One predicted test-window day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldPrediction {
    pub date: NaiveDate,
    pub cutoff: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvReport {
    /// Sorted by fold index
    pub folds: Vec<FoldScore>,
    pub predictions: Vec<FoldPrediction>,
    pub aggregation: MetricAggregation,
    pub metrics: ForecastMetrics,
}

impl CvReport {
    /// Aggregated MAPE, the ranking score (lower is better)
    pub fn score(&self) -> f64 {
        self.metrics.mape
    }
}

struct FoldOutcome {
    score: FoldScore,
    predictions: Vec<FoldPrediction>,
}

#[derive(Debug, Clone)]
pub struct CrossValidator {
    config: CvConfig,
    aggregation: MetricAggregation,
    execution: ExecutionMode,
    stage: Stage,
}

impl CrossValidator {
    pub fn new(config: CvConfig) -> Self {
        Self {
            config,
            aggregation: MetricAggregation::default(),
            execution: ExecutionMode::default(),
            stage: Stage::Searching,
        }
    }

    pub fn with_aggregation(mut self, aggregation: MetricAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    /// Stage reported when the series is too short
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn config(&self) -> &CvConfig {
        &self.config
    }

    pub fn aggregation(&self) -> MetricAggregation {
        self.aggregation
    }

    pub fn execution(&self) -> ExecutionMode {
        self.execution
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Lay out the folds for `series`; fails before any fitting when not
    /// even one fold fits
    pub fn folds(&self, series: &TimeSeries) -> Result<Vec<Fold>> {
        self.config.validate()?;
        let count = self.config.fold_count(series.len());
        if count == 0 {
            return Err(ForecastError::InsufficientHistory {
                stage: self.stage,
                required: self.config.min_length(),
                actual: series.len(),
            });
        }

        Ok((0..count)
            .map(|index| {
                let test_start = self.config.initial + index * self.config.period;
                Fold {
                    index,
                    train_end: test_start,
                    test_start,
                    test_end: test_start + self.config.horizon,
                    cutoff: series.date_at(test_start - 1),
                }
            })
            .collect())
    }

    /// Fit `model` on every fold's training prefix and score its forecast
    /// of the test window
    pub fn evaluate<M>(&self, model: &M, series: &TimeSeries) -> Result<CvReport>
    where
        M: ForecastModel + 'static,
    {
        let folds = self.folds(series)?;

        let mut outcomes = match self.execution {
            ExecutionMode::Sequential => folds
                .iter()
                .map(|fold| evaluate_fold(model, series, fold))
                .collect::<Result<Vec<_>>>()?,
            ExecutionMode::Parallel {
                workers,
                fold_timeout,
            } => self.evaluate_parallel(model, series, &folds, workers, fold_timeout)?,
        };
        outcomes.sort_by_key(|o| o.score.fold);

        let scores: Vec<FoldScore> = outcomes.iter().map(|o| o.score).collect();
        let metrics = match self.aggregation {
            MetricAggregation::LatestFold => scores
                .last()
                .map(|s| s.metrics)
                .ok_or_else(|| ForecastError::Model("No folds were evaluated".to_string()))?,
            MetricAggregation::MeanAcrossFolds => {
                let all: Vec<ForecastMetrics> = scores.iter().map(|s| s.metrics).collect();
                ForecastMetrics::mean_of(&all)?
            }
        };

        debug!(
            model = model.name(),
            folds = scores.len(),
            mape = metrics.mape,
            "cross-validation finished"
        );

        Ok(CvReport {
            folds: scores,
            predictions: outcomes.into_iter().flat_map(|o| o.predictions).collect(),
            aggregation: self.aggregation,
            metrics,
        })
    }

    fn evaluate_parallel<M>(
        &self,
        model: &M,
        series: &TimeSeries,
        folds: &[Fold],
        workers: usize,
        fold_timeout: Duration,
    ) -> Result<Vec<FoldOutcome>>
    where
        M: ForecastModel + 'static,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .panic_handler(|_| error!("cross-validation worker panicked"))
            .build()
            .map_err(|e| ForecastError::Model(format!("Failed to start worker pool: {}", e)))?;

        let shared = Arc::new(series.clone());
        let (tx, rx) = mpsc::channel();
        for fold in folds.iter().copied() {
            let tx = tx.clone();
            let model = model.clone();
            let series = Arc::clone(&shared);
            pool.spawn(move || {
                let outcome = evaluate_fold(&model, &series, &fold);
                // the collector may already have given up
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(folds.len());
        while outcomes.len() < folds.len() {
            match rx.recv_timeout(fold_timeout) {
                Ok(outcome) => outcomes.push(outcome?),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ForecastError::FoldTimeout {
                        pending: folds.len() - outcomes.len(),
                        timeout: fold_timeout,
                    })
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ForecastError::Model(format!(
                        "{} fold(s) ended without reporting a score",
                        folds.len() - outcomes.len()
                    )))
                }
            }
        }
        Ok(outcomes)
    }
}

fn evaluate_fold<M: ForecastModel>(model: &M, series: &TimeSeries, fold: &Fold) -> Result<FoldOutcome> {
    let train = series.head(fold.train_end)?;
    let horizon = fold.test_end - fold.test_start;
    let forecast = model.train(&train)?.forecast(horizon)?;

    let actual = series.window(fold.test_start..fold.test_end);
    let metrics = evaluate_forecast(actual, forecast.values())?;

    let predictions = forecast
        .values()
        .iter()
        .zip(actual)
        .enumerate()
        .map(|(i, (predicted, actual))| FoldPrediction {
            date: series.date_at(fold.test_start + i),
            cutoff: fold.cutoff,
            actual: *actual,
            predicted: *predicted,
        })
        .collect();

    debug!(
        model = model.name(),
        fold = fold.index,
        cutoff = %fold.cutoff,
        mape = metrics.mape,
        "fold scored"
    );

    Ok(FoldOutcome {
        score: FoldScore {
            fold: fold.index,
            cutoff: fold.cutoff,
            metrics,
        },
        predictions,
    })
}
