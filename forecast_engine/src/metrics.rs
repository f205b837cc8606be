//! Metrics for evaluating forecast performance
//!
//! Percentage metrics are reported as fractions (0.05 is 5%).

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

impl ForecastMetrics {
    /// Field-wise mean of several metric sets
    pub fn mean_of(all: &[ForecastMetrics]) -> Result<ForecastMetrics> {
        if all.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Cannot average an empty set of metrics".to_string(),
            ));
        }

        let n = all.len() as f64;
        let avg = |f: fn(&ForecastMetrics) -> f64| all.iter().map(f).sum::<f64>() / n;
        Ok(ForecastMetrics {
            mae: avg(|m| m.mae),
            mse: avg(|m| m.mse),
            rmse: avg(|m| m.rmse),
            mape: avg(|m| m.mape),
            smape: avg(|m| m.smape),
        })
    }

    pub fn is_finite(&self) -> bool {
        self.mae.is_finite() && self.rmse.is_finite() && self.mape.is_finite()
    }
}

impl std::fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape * 100.0)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape * 100.0)?;
        Ok(())
    }
}

/// Compare a forecast with the values that actually occurred.
///
/// MAPE skips zero actuals; if every actual is zero it is NaN and the
/// forecast cannot be ranked on it.
pub fn evaluate_forecast(actual: &[f64], forecast: &[f64]) -> Result<ForecastMetrics> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::InvalidParameter(format!(
            "Forecast and actual values must have the same non-zero length (got {} and {})",
            forecast.len(),
            actual.len()
        )));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = actual.iter().zip(forecast).map(|(a, f)| a - f).collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    let pct: Vec<f64> = actual
        .iter()
        .zip(&errors)
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, e)| e.abs() / a.abs())
        .collect();
    let mape = if pct.is_empty() {
        f64::NAN
    } else {
        pct.iter().sum::<f64>() / pct.len() as f64
    };

    let smape = actual
        .iter()
        .zip(forecast)
        .map(|(a, f)| {
            let denom = a.abs() + f.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - f).abs() / denom
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastMetrics {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

/// Round to a fixed number of decimals for display
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_evaluate_forecast() {
        let actual = [100.0, 200.0, 400.0];
        let forecast = [110.0, 190.0, 400.0];
        let metrics = evaluate_forecast(&actual, &forecast).unwrap();

        assert_relative_eq!(metrics.mae, 20.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.mse, 200.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.mape, (0.1 + 0.05 + 0.0) / 3.0, epsilon = 1e-12);
        assert!(metrics.smape > 0.0 && metrics.smape < metrics.mape * 2.0);
    }

    #[test]
    fn test_zero_actuals_are_skipped_for_mape() {
        let metrics = evaluate_forecast(&[0.0, 10.0], &[1.0, 11.0]).unwrap();
        assert_relative_eq!(metrics.mape, 0.1, epsilon = 1e-12);

        let all_zero = evaluate_forecast(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert!(all_zero.mape.is_nan());
        assert!(!all_zero.is_finite());
    }

    #[test]
    fn test_length_mismatch() {
        assert!(evaluate_forecast(&[1.0, 2.0], &[1.0]).is_err());
        assert!(evaluate_forecast(&[], &[]).is_err());
    }

    #[test]
    fn test_mean_of_and_rounding() {
        let a = evaluate_forecast(&[10.0], &[11.0]).unwrap();
        let b = evaluate_forecast(&[10.0], &[13.0]).unwrap();
        let mean = ForecastMetrics::mean_of(&[a, b]).unwrap();
        assert_relative_eq!(mean.mae, 2.0);
        assert_relative_eq!(mean.mape, 0.2, epsilon = 1e-12);

        assert_eq!(round_to(0.123_456, 3), 0.123);
        assert_eq!(round_to(0.9876, 3), 0.988);
    }
}
