//! Lifecycle of a single forecast request
//!
//! `INITIALIZED → SEARCHING | COMPARING → TUNING → FINALIZING → FORECASTING`.
//! The seasonal search strategy goes straight from SEARCHING to FINALIZING
//! because its grid search is its tuning step.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Initialized,
    Searching,
    Comparing,
    Tuning,
    Finalizing,
    Forecasting,
}

impl Stage {
    /// Stages reachable in one step from `self`
    pub fn successors(self) -> &'static [Stage] {
        match self {
            Stage::Initialized => &[Stage::Searching, Stage::Comparing],
            Stage::Searching => &[Stage::Tuning, Stage::Finalizing],
            Stage::Comparing => &[Stage::Tuning],
            Stage::Tuning => &[Stage::Finalizing],
            Stage::Finalizing => &[Stage::Forecasting],
            Stage::Forecasting => &[],
        }
    }

    pub fn can_advance_to(self, next: Stage) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Initialized => "INITIALIZED",
            Stage::Searching => "SEARCHING",
            Stage::Comparing => "COMPARING",
            Stage::Tuning => "TUNING",
            Stage::Finalizing => "FINALIZING",
            Stage::Forecasting => "FORECASTING",
        };
        f.write_str(label)
    }
}

/// Records the stages a request passes through and rejects illegal moves
#[derive(Debug, Clone)]
pub struct StageTracker {
    history: Vec<Stage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            history: vec![Stage::Initialized],
        }
    }

    pub fn current(&self) -> Stage {
        *self.history.last().unwrap_or(&Stage::Initialized)
    }

    /// Every stage entered so far, oldest first
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn advance(&mut self, next: Stage) -> Result<()> {
        let from = self.current();
        if !from.can_advance_to(next) {
            return Err(ForecastError::InvalidStageTransition { from, to: next });
        }

        debug!(%from, to = %next, "stage transition");
        self.history.push(next);
        Ok(())
    }

    /// Position of `stage` in the history, if it was entered
    pub fn entered_at(&self, stage: Stage) -> Option<usize> {
        self.history.iter().position(|s| *s == stage)
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_automl_path() {
        let mut tracker = StageTracker::new();
        for stage in [
            Stage::Comparing,
            Stage::Tuning,
            Stage::Finalizing,
            Stage::Forecasting,
        ] {
            tracker.advance(stage).unwrap();
        }

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
    }

    #[test]
    fn test_no_return_to_search_after_tuning() {
        let mut tracker = StageTracker::new();
        tracker.advance(Stage::Searching).unwrap();
        tracker.advance(Stage::Tuning).unwrap();

        let err = tracker.advance(Stage::Searching).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InvalidStageTransition {
                from: Stage::Tuning,
                to: Stage::Searching
            }
        ));
        assert_eq!(tracker.current(), Stage::Tuning);
    }

    #[test]
    fn test_forecasting_is_terminal() {
        assert!(Stage::Forecasting.successors().is_empty());
        assert!(!Stage::Initialized.can_advance_to(Stage::Finalizing));
    }
}
