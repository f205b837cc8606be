//! Cleaning of raw provider observations into a gap-free daily series

use crate::data::{RawObservation, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::stage::Stage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// How to collapse several observations that share a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the observation delivered last
    #[default]
    Last,
    /// Add the values together
    Sum,
}

/// Turns provider rows into a [`TimeSeries`]:
/// drops missing and non-finite values, sorts by date, collapses duplicate
/// dates, then reindexes to one row per calendar day carrying the last known
/// value forward.
#[derive(Debug, Clone, Default)]
pub struct SeriesPreprocessor {
    duplicates: DuplicatePolicy,
}

impl SeriesPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn process(&self, symbol: &str, raw: &[RawObservation]) -> Result<TimeSeries> {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut dropped = 0usize;

        for obs in raw {
            let value = match obs.value {
                Some(v) if v.is_finite() => v,
                _ => {
                    dropped += 1;
                    continue;
                }
            };
            match self.duplicates {
                DuplicatePolicy::Last => {
                    by_date.insert(obs.date, value);
                }
                DuplicatePolicy::Sum => {
                    *by_date.entry(obs.date).or_insert(0.0) += value;
                }
            }
        }

        let (first, last) = match (by_date.keys().next(), by_date.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(ForecastError::InsufficientHistory {
                    stage: Stage::Initialized,
                    required: 1,
                    actual: 0,
                })
            }
        };

        let days = (last - first).num_days() as usize + 1;
        let mut values = Vec::with_capacity(days);
        let mut carried = by_date[&first];
        let mut filled = 0usize;
        for date in first.iter_days().take(days) {
            match by_date.get(&date) {
                Some(v) => carried = *v,
                None => filled += 1,
            }
            values.push(carried);
        }

        debug!(
            symbol,
            observations = raw.len(),
            dropped,
            filled,
            days,
            "preprocessed series"
        );

        TimeSeries::new(symbol, first, values)
    }
}
