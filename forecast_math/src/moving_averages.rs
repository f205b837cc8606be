//! Streaming smoothers
//!
//! - Simple Moving Average over a fixed window
//! - Exponential smoother with an explicit smoothing factor

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) over the last `period` values
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value, dropping the oldest once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Current average; errors until `period` values have been seen
    pub fn value(&self) -> Result<f64> {
        if self.values.len() < self.period {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for SMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.sum / self.period as f64)
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Feed a whole slice and return the one-step-ahead predictions that the
    /// window produced before each value (`None` until the window is full).
    pub fn one_step_predictions(&mut self, values: &[f64]) -> Vec<Option<f64>> {
        values
            .iter()
            .map(|&v| {
                let prediction = self.value().ok();
                self.update(v);
                prediction
            })
            .collect()
    }
}

/// Exponential smoother: `level = alpha * x + (1 - alpha) * level`,
/// seeded with the first observation.
#[derive(Debug, Clone)]
pub struct ExponentialSmoother {
    alpha: f64,
    level: Option<f64>,
}

impl ExponentialSmoother {
    /// `alpha` must lie strictly between 0 and 1
    pub fn new(alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 || !alpha.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "Alpha must be between 0 and 1, got {}",
                alpha
            )));
        }

        Ok(Self { alpha, level: None })
    }

    pub fn update(&mut self, value: f64) {
        self.level = Some(match self.level {
            None => value,
            Some(level) => self.alpha * value + (1.0 - self.alpha) * level,
        });
    }

    pub fn value(&self) -> Result<f64> {
        self.level.ok_or_else(|| {
            MathError::InsufficientData("Exponential smoother has seen no values".to_string())
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Smooth a whole slice, returning the level before each value was absorbed
    /// (the first entry is `None`).
    pub fn one_step_predictions(&mut self, values: &[f64]) -> Vec<Option<f64>> {
        values
            .iter()
            .map(|&v| {
                let prediction = self.level;
                self.update(v);
                prediction
            })
            .collect()
    }
}
