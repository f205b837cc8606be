//! AR(p) on price levels, fit by least squares with an intercept

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{
    dated_forecast, ensure_history, ensure_horizon, residual_sigma, ForecastModel, ForecastResult,
    TrainedForecastModel, DEFAULT_INTERVAL_WIDTH,
};
use chrono::NaiveDate;
use forecast_math::linalg::{dot, least_squares};

#[derive(Debug, Clone)]
pub struct AutoRegressive {
    name: String,
    order: usize,
}

#[derive(Debug, Clone)]
pub struct TrainedAutoRegressive {
    name: String,
    end: NaiveDate,
    /// `[intercept, φ1, …, φp]`
    coefficients: Vec<f64>,
    /// Last `p` observations, oldest first
    tail: Vec<f64>,
    sigma: f64,
}

impl AutoRegressive {
    pub fn new(order: usize) -> Result<Self> {
        if order == 0 {
            return Err(ForecastError::InvalidParameter(
                "Autoregressive order must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            name: format!("AR({})", order),
            order,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    fn lag_row(&self, history: &[f64], t: usize) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.order + 1);
        row.push(1.0);
        row.extend((1..=self.order).map(|lag| history[t - lag]));
        row
    }
}

impl ForecastModel for AutoRegressive {
    type Trained = TrainedAutoRegressive;

    fn train(&self, series: &TimeSeries) -> Result<Self::Trained> {
        ensure_history(&self.name, self.min_history(), series.len())?;
        let values = series.values();
        let p = self.order;

        let rows: Vec<Vec<f64>> = (p..values.len()).map(|t| self.lag_row(values, t)).collect();
        let targets = &values[p..];
        let coefficients = least_squares(&rows, targets)?;

        let residuals: Vec<f64> = rows
            .iter()
            .zip(targets)
            .map(|(row, y)| y - dot(row, &coefficients))
            .collect();

        Ok(TrainedAutoRegressive {
            name: self.name.clone(),
            end: series.end(),
            coefficients,
            tail: values[values.len() - p..].to_vec(),
            sigma: residual_sigma(&residuals),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        2 * self.order + 2
    }
}

impl TrainedForecastModel for TrainedAutoRegressive {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ensure_horizon(horizon)?;
        let p = self.tail.len();

        // recursive: each step feeds the previous predictions back in as lags
        let mut history = self.tail.clone();
        for _ in 0..horizon {
            let t = history.len();
            let mut next = self.coefficients[0];
            for lag in 1..=p {
                next += self.coefficients[lag] * history[t - lag];
            }
            history.push(next);
        }

        dated_forecast(
            self.end,
            history.split_off(p),
            self.sigma,
            DEFAULT_INTERVAL_WIDTH,
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_ar1_process() {
        // y_t = 2 + 0.8 y_{t-1}, converging towards 10
        let mut values = vec![20.0];
        for _ in 0..59 {
            let last = *values.last().unwrap();
            values.push(2.0 + 0.8 * last);
        }
        let series =
            TimeSeries::new("AR", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), values.clone()).unwrap();

        let forecast = AutoRegressive::new(1).unwrap().train(&series).unwrap().forecast(2).unwrap();
        let expected = 2.0 + 0.8 * values[59];
        assert_relative_eq!(forecast.values()[0], expected, epsilon = 1e-4);
        assert_relative_eq!(forecast.values()[1], 2.0 + 0.8 * expected, epsilon = 1e-4);
    }

    #[test]
    fn test_order_validation() {
        assert!(AutoRegressive::new(0).is_err());

        let short = TimeSeries::new("AR", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), vec![1.0; 5]).unwrap();
        assert!(AutoRegressive::new(3).unwrap().train(&short).is_err());
    }
}
