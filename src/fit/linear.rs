//! Ordinary and weighted linear least squares with parameter covariance.
use log::warn;
use nalgebra::{DMatrix, DVector};

use crate::error::{Result, StatError};

/// Solution of a linear least-squares problem.
#[derive(Clone, Debug)]
pub struct LinearFit {
    pub params: DVector<f64>,
    /// `s²·(XᵀWX)⁻¹`, absent when there are no residual degrees of freedom.
    pub covariance: Option<DMatrix<f64>>,
    /// (Weighted) residual sum of squares.
    pub rss: f64,
    pub nobs: usize,
}

impl LinearFit {
    /// Standard errors, NaN when the covariance is unavailable.
    pub fn stderrs(&self) -> Vec<f64> {
        match &self.covariance {
            Some(cov) => (0..self.params.len())
                .map(|i| cov[(i, i)].abs().sqrt())
                .collect(),
            None => vec![f64::NAN; self.params.len()],
        }
    }

    pub fn residual_dof(&self) -> usize {
        self.nobs.saturating_sub(self.params.len())
    }
}

/// Least squares for `y ≈ X·β` with optional per-row weights.
pub fn least_squares(
    design: &DMatrix<f64>,
    y: &DVector<f64>,
    weights: Option<&[f64]>,
) -> Result<LinearFit> {
    let (n, p) = design.shape();
    if y.len() != n {
        return Err(StatError::ShapeMismatch {
            expected: vec![n],
            found: vec![y.len()],
        });
    }
    if n < p {
        return Err(StatError::InsufficientData {
            context: "linear least squares",
            needed: p,
            found: n,
        });
    }

    let (xw, yw) = match weights {
        Some(w) => {
            if w.len() != n {
                return Err(StatError::ShapeMismatch {
                    expected: vec![n],
                    found: vec![w.len()],
                });
            }
            let mut xw = design.clone();
            let mut yw = y.clone();
            for (i, &wi) in w.iter().enumerate() {
                if !(wi.is_finite() && wi >= 0.0) {
                    return Err(StatError::NonFiniteInput {
                        context: "least-squares weights",
                    });
                }
                let s = wi.sqrt();
                xw.row_mut(i).scale_mut(s);
                yw[i] *= s;
            }
            (xw, yw)
        }
        None => (design.clone(), y.clone()),
    };

    let xtx = xw.transpose() * &xw;
    let xty = xw.transpose() * &yw;
    let xtx_inv = xtx.try_inverse().ok_or(StatError::SingularFit {
        context: "linear least squares",
    })?;
    let params = &xtx_inv * xty;
    let resid = &yw - &xw * &params;
    let rss = resid.norm_squared();

    let covariance = if n > p {
        let s2 = rss / (n - p) as f64;
        Some(xtx_inv * s2)
    } else {
        warn!(
            "least squares with {n} points and {p} parameters leaves no residual degrees of freedom; standard errors are NaN"
        );
        None
    };

    Ok(LinearFit {
        params,
        covariance,
        rss,
        nobs: n,
    })
}

/// Fit `y = intercept + slope·x`. Parameters are `[intercept, slope]`.
pub fn fit_line(x: &[f64], y: &[f64], weights: Option<&[f64]>) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(StatError::ShapeMismatch {
            expected: vec![x.len()],
            found: vec![y.len()],
        });
    }
    if x.len() < 2 {
        return Err(StatError::InsufficientData {
            context: "line fit",
            needed: 2,
            found: x.len(),
        });
    }
    let design = DMatrix::from_fn(x.len(), 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    least_squares(&design, &DVector::from_column_slice(y), weights)
}
