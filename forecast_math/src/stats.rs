//! Descriptive statistics over plain slices
//!
//! Thin checked wrappers over `statrs`: empty input and invalid values
//! become [`MathError`]s instead of NaN.

use crate::{MathError, Result};
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty slice".to_string(),
        ));
    }

    Ok(values.iter().mean())
}

/// Sample standard deviation (n - 1 denominator). A single value has zero spread.
pub fn std_dev(values: &[f64]) -> Result<f64> {
    mean(values)?;
    if values.len() < 2 {
        return Ok(0.0);
    }

    Ok(values.iter().std_dev())
}

/// Root mean square, used for residual scale estimates
pub fn root_mean_square(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the RMS of an empty slice".to_string(),
        ));
    }

    Ok(values.iter().quadratic_mean())
}

/// Empirical quantile with linear interpolation between order statistics.
///
/// `q` must lie in `[0, 1]`. NaN inputs are rejected. This is the
/// `(n - 1) q` position rule; `statrs`' `OrderStatistics::quantile` uses a
/// different estimator, so interval bounds keep their own interpolation.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take a quantile of an empty slice".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be within [0, 1], got {}",
            q
        )));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(MathError::InvalidInput(
            "Quantile input contains NaN".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median; the mean of the middle pair for even lengths
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the median of an empty slice".to_string(),
        ));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(MathError::InvalidInput(
            "Median input contains NaN".to_string(),
        ));
    }

    // statrs' estimator is the midpoint rule at the 0.5 level
    let mut data = Data::new(values.to_vec());
    Ok(data.quantile(0.5))
}

/// Geometric mean of strictly positive values
pub fn geometric_mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the geometric mean of an empty slice".to_string(),
        ));
    }
    if let Some(bad) = values.iter().find(|v| **v <= 0.0 || !v.is_finite()) {
        return Err(MathError::InvalidInput(format!(
            "Geometric mean requires strictly positive finite values, got {}",
            bad
        )));
    }

    Ok(values.iter().geometric_mean())
}

/// Ordinary least squares slope and intercept of `values` against `0..n`
pub fn linear_trend(values: &[f64]) -> Result<(f64, f64)> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Need at least 2 values for a trend line, have {}",
            values.len()
        )));
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values)?;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }

    let slope = num / den;
    Ok((slope, y_mean - slope * x_mean))
}
