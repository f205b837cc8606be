//! Progress notifications for long-running requests

use crate::params::ParamSet;
use crate::error::Result;
use crate::stage::{Stage, StageTracker};
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StageEntered(Stage),
    TrialScored {
        trial: usize,
        of: usize,
        params: ParamSet,
        score: f64,
    },
    CandidateScored {
        model: String,
        score: f64,
    },
}

/// Receives progress from the engine. Implementations must be cheap; they
/// are called inline on the search thread.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: &ProgressEvent);
}

/// Emits each event as a `tracing` record
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn notify(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::StageEntered(stage) => info!(%stage, "entering stage"),
            ProgressEvent::TrialScored {
                trial,
                of,
                params,
                score,
            } => info!(trial = trial + 1, of, %params, score, "trial scored"),
            ProgressEvent::CandidateScored { model, score } => {
                info!(%model, score, "candidate scored")
            }
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn notify(&self, _event: &ProgressEvent) {}
}

/// Keeps every event, for inspection after a run
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ProgressSink for RecordingProgress {
    fn notify(&self, event: &ProgressEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
    }
}

/// Advance `tracker` and announce the new stage
pub fn enter_stage(
    tracker: &mut StageTracker,
    stage: Stage,
    progress: &dyn ProgressSink,
) -> Result<()> {
    tracker.advance(stage)?;
    progress.notify(&ProgressEvent::StageEntered(stage));
    Ok(())
}
