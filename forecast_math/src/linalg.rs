//! Penalised least squares on small dense systems
//!
//! Designs here are at most a few dozen columns wide (trend changepoints,
//! Fourier pairs, holiday indicators, AR lags), so the normal equations are
//! formed explicitly with `nalgebra` and solved by Cholesky, falling back
//! to LU when the factorisation breaks down.

use crate::{MathError, Result};
use nalgebra::{DMatrix, DVector};

/// Diagonal jitter added to every normal-equation system
const JITTER: f64 = 1e-9;

/// Solve `min ||X b - y||² + Σ λ_j b_j²` for `b`.
///
/// `rows` is the design matrix in row-major form, `penalties` holds one
/// non-negative `λ_j` per column.
pub fn ridge_solve(rows: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    if rows.is_empty() {
        return Err(MathError::InsufficientData(
            "Design matrix has no rows".to_string(),
        ));
    }
    if rows.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            rows.len(),
            y.len()
        )));
    }

    let p = penalties.len();
    if p == 0 {
        return Err(MathError::InvalidInput(
            "Design matrix has no columns".to_string(),
        ));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != p) {
        return Err(MathError::InvalidInput(format!(
            "Row {} has {} columns, expected {}",
            bad,
            rows[bad].len(),
            p
        )));
    }
    if penalties.iter().any(|l| *l < 0.0 || !l.is_finite()) {
        return Err(MathError::InvalidInput(
            "Penalties must be finite and non-negative".to_string(),
        ));
    }

    let x = DMatrix::from_fn(rows.len(), p, |i, j| rows[i][j]);
    let target = DVector::from_column_slice(y);

    let ridge = DMatrix::from_diagonal(&DVector::from_iterator(
        p,
        penalties.iter().map(|l| l + JITTER),
    ));
    let xtx = x.transpose() * &x + ridge;
    let xty = x.transpose() * &target;

    let beta = match xtx.clone().cholesky() {
        Some(factor) => factor.solve(&xty),
        None => xtx.lu().solve(&xty).ok_or_else(|| {
            MathError::CalculationError("Normal equations are singular".to_string())
        })?,
    };

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(MathError::CalculationError(
            "Least squares produced non-finite coefficients".to_string(),
        ));
    }

    Ok(beta.iter().copied().collect())
}

/// Plain least squares (all penalties zero apart from the jitter)
pub fn least_squares(rows: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>> {
    let p = rows.first().map(Vec::len).unwrap_or(0);
    ridge_solve(rows, y, &vec![0.0; p])
}

/// Dot product of a design row with a coefficient vector
pub fn dot(row: &[f64], coefficients: &[f64]) -> f64 {
    row.iter().zip(coefficients).map(|(x, b)| x * b).sum()
}
