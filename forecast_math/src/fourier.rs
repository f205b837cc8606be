//! Fourier terms for smooth periodic components

use crate::{MathError, Result};
use std::f64::consts::PI;

/// Build `2 * order` Fourier columns for each time point.
///
/// `t_days` is time measured in days from an arbitrary origin. Columns are
/// laid out as `[sin(2πkt/P), cos(2πkt/P)]` for `k = 1..=order`.
pub fn fourier_features(t_days: &[f64], period: f64, order: usize) -> Result<Vec<Vec<f64>>> {
    if period <= 0.0 || !period.is_finite() {
        return Err(MathError::InvalidInput(format!(
            "Fourier period must be positive, got {}",
            period
        )));
    }
    if order == 0 {
        return Err(MathError::InvalidInput(
            "Fourier order must be at least 1".to_string(),
        ));
    }

    Ok(t_days
        .iter()
        .map(|&t| {
            let mut row = Vec::with_capacity(2 * order);
            for k in 1..=order {
                let angle = 2.0 * PI * k as f64 * t / period;
                row.push(angle.sin());
                row.push(angle.cos());
            }
            row
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_shape_and_periodicity() {
        let t: Vec<f64> = (0..15).map(|d| d as f64).collect();
        let rows = fourier_features(&t, 7.0, 3).unwrap();

        assert_eq!(rows.len(), 15);
        assert!(rows.iter().all(|r| r.len() == 6));
        for j in 0..6 {
            assert_abs_diff_eq!(rows[0][j], rows[7][j], epsilon = 1e-9);
            assert_abs_diff_eq!(rows[1][j], rows[8][j], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(fourier_features(&[0.0], 0.0, 3).is_err());
        assert!(fourier_features(&[0.0], 7.0, 0).is_err());
    }
}
