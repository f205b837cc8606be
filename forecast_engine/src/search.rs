//! Random-sample grid search scored by cross-validation

use crate::data::TimeSeries;
use crate::cv::CrossValidator;
use crate::error::{ForecastError, Result};
use crate::metrics::ForecastMetrics;
use crate::models::{CandidateModel, ForecastModel};
use crate::params::{ParamSet, ParameterGrid};
use crate::progress::{ProgressEvent, ProgressSink};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{info, warn};

/// One sampled combination and how it scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Position in sample order
    pub trial: usize,
    pub params: ParamSet,
    /// Aggregated cross-validation MAPE; NaN when the trial failed
    pub score: f64,
    pub metrics: Option<ForecastMetrics>,
    pub error: Option<String>,
}

impl TrialResult {
    pub fn is_scored(&self) -> bool {
        self.score.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Every trial in sample order
    pub trials: Vec<TrialResult>,
    /// Index into `trials` of the winner
    best: usize,
}

impl SearchOutcome {
    pub fn best(&self) -> &TrialResult {
        &self.trials[self.best]
    }

    pub fn best_params(&self) -> &ParamSet {
        &self.best().params
    }

    /// Trials by ascending score; ties keep sample order and failed trials
    /// come last
    pub fn ranked(&self) -> Vec<&TrialResult> {
        let mut ranked: Vec<&TrialResult> = self.trials.iter().collect();
        ranked.sort_by(|a, b| match (a.is_scored(), b.is_scored()) {
            (true, true) => a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        });
        ranked
    }
}

#[derive(Debug, Clone)]
pub struct HyperparameterSearch {
    grid: ParameterGrid,
    trial_bound: usize,
    seed: u64,
}

impl HyperparameterSearch {
    pub fn new(grid: ParameterGrid, trial_bound: usize) -> Result<Self> {
        grid.validate()?;
        if trial_bound == 0 {
            return Err(ForecastError::Configuration(
                "Trial bound must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            grid,
            trial_bound,
            seed: 0,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn grid(&self) -> &ParameterGrid {
        &self.grid
    }

    /// `min(trial_bound, grid size)` distinct combinations drawn uniformly
    /// from the full product
    pub fn sample(&self) -> Vec<ParamSet> {
        let all = self.grid.combinations();
        let amount = self.trial_bound.min(all.len());
        let mut rng = StdRng::seed_from_u64(self.seed);

        sample(&mut rng, all.len(), amount)
            .into_iter()
            .map(|i| all[i].clone())
            .collect()
    }

    /// Fit and cross-validate each sampled combination on `series` and pick
    /// the lowest score, ties going to the earliest sampled.
    pub fn run<F>(
        &self,
        series: &TimeSeries,
        validator: &CrossValidator,
        build: F,
        progress: &dyn ProgressSink,
    ) -> Result<SearchOutcome>
    where
        F: Fn(&ParamSet) -> Result<CandidateModel>,
    {
        validator.folds(series)?;

        let combos = self.sample();
        let total = combos.len();
        info!(
            combinations = self.grid.size(),
            sampled = total,
            seed = self.seed,
            "starting hyperparameter search"
        );

        let mut trials = Vec::with_capacity(total);
        for (trial, params) in combos.into_iter().enumerate() {
            let result = build(&params).and_then(|model| {
                // a combination that cannot fit the full history is not viable
                model.train(series)?;
                validator.evaluate(&model, series)
            });

            let (score, metrics, error) = match result {
                Ok(report) => (report.score(), Some(report.metrics), None),
                Err(e) => {
                    warn!(%params, error = %e, "trial failed");
                    (f64::NAN, None, Some(e.to_string()))
                }
            };

            progress.notify(&ProgressEvent::TrialScored {
                trial,
                of: total,
                params: params.clone(),
                score,
            });
            trials.push(TrialResult {
                trial,
                params,
                score,
                metrics,
                error,
            });
        }

        let mut best: Option<usize> = None;
        for (i, t) in trials.iter().enumerate() {
            if t.is_scored() && best.map_or(true, |b| t.score < trials[b].score) {
                best = Some(i);
            }
        }

        let best = best.ok_or_else(|| ForecastError::SelectionFailure {
            stage: validator.stage(),
            reason: format!("none of the {} sampled combinations produced a finite score", total),
        })?;

        info!(
            best = %trials[best].params,
            score = trials[best].score,
            "hyperparameter search finished"
        );

        Ok(SearchOutcome { trials, best })
    }
}
