//! Broken-line (segmented) regression with an estimated break point.
//!
//! The break is refined with Muggeo's linearisation: given a current break
//! `ψ`, regress `y` on `x`, `(x − ψ)₊` and `−I(x > ψ)`; the last coefficient
//! `γ` over the slope change `β` is the update to `ψ`.
use log::debug;
use nalgebra::{DMatrix, DVector};

use super::linear::least_squares;
use crate::error::{Result, StatError};

const MAX_ITERS: usize = 30;
const TOL: f64 = 1e-8;
/// Points required on each side of the break.
pub const MIN_POINTS_PER_SEGMENT: usize = 3;

#[derive(Clone, Debug)]
pub struct SegmentedFit {
    pub intercept: f64,
    /// Slope below the break.
    pub slope: f64,
    /// Slope above the break.
    pub slope2: f64,
    pub brk: f64,
    /// Errors on `[intercept, slope, slope2, brk]`.
    pub stderrs: [f64; 4],
    pub iterations: usize,
    pub converged: bool,
    pub nobs: usize,
}

/// Fit two joined lines to `(x, y)` starting from break `brk0`.
pub fn fit_segmented(
    x: &[f64],
    y: &[f64],
    brk0: f64,
    weights: Option<&[f64]>,
) -> Result<SegmentedFit> {
    if x.len() != y.len() {
        return Err(StatError::ShapeMismatch {
            expected: vec![x.len()],
            found: vec![y.len()],
        });
    }
    let n = x.len();
    let yv = DVector::from_column_slice(y);
    let mut psi = brk0;
    let mut gamma_err = f64::NAN;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..MAX_ITERS {
        check_segments(x, psi)?;
        iterations = iter + 1;
        let design = DMatrix::from_fn(n, 4, |i, j| match j {
            0 => 1.0,
            1 => x[i],
            2 => (x[i] - psi).max(0.0),
            _ => {
                if x[i] > psi {
                    -1.0
                } else {
                    0.0
                }
            }
        });
        let fit = least_squares(&design, &yv, weights)?;
        let beta = fit.params[2];
        let gamma = fit.params[3];
        if beta.abs() < f64::EPSILON {
            return Err(StatError::SingularFit {
                context: "segmented regression (no slope change at break)",
            });
        }
        gamma_err = fit.stderrs()[3];
        let step = gamma / beta;
        psi += step;
        if step.abs() < TOL {
            converged = true;
            break;
        }
    }
    check_segments(x, psi)?;

    let design = DMatrix::from_fn(n, 3, |i, j| match j {
        0 => 1.0,
        1 => x[i],
        _ => (x[i] - psi).max(0.0),
    });
    let fit = least_squares(&design, &yv, weights)?;
    let (a, b, c) = (fit.params[0], fit.params[1], fit.params[2]);
    let stderrs = match &fit.covariance {
        Some(cov) => {
            let slope2_var = cov[(1, 1)] + cov[(2, 2)] + 2.0 * cov[(1, 2)];
            [
                cov[(0, 0)].abs().sqrt(),
                cov[(1, 1)].abs().sqrt(),
                slope2_var.abs().sqrt(),
                gamma_err / c.abs(),
            ]
        }
        None => [f64::NAN; 4],
    };

    debug!(
        "segmented fit: break={psi:.4} slopes=({b:.3}, {:.3}) after {iterations} iterations (converged={converged})",
        b + c
    );

    Ok(SegmentedFit {
        intercept: a,
        slope: b,
        slope2: b + c,
        brk: psi,
        stderrs,
        iterations,
        converged,
        nobs: n,
    })
}

fn check_segments(x: &[f64], psi: f64) -> Result<()> {
    let below = x.iter().filter(|&&v| v <= psi).count();
    let above = x.len() - below;
    let found = below.min(above);
    if !psi.is_finite() || found < MIN_POINTS_PER_SEGMENT {
        return Err(StatError::InsufficientData {
            context: "broken power-law segment",
            needed: MIN_POINTS_PER_SEGMENT,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken_line(x: &[f64], brk: f64) -> Vec<f64> {
        x.iter()
            .map(|&v| 1.0 - 1.0 * v - 2.0 * (v - brk).max(0.0))
            .collect()
    }

    #[test]
    fn recovers_break_and_slopes() {
        let x: Vec<f64> = (0..40).map(|i| -2.0 + i as f64 * 0.05).collect();
        let y = broken_line(&x, -1.13);
        let fit = fit_segmented(&x, &y, -0.8, None).unwrap();
        assert!((fit.brk + 1.13).abs() < 1e-3, "break {}", fit.brk);
        assert!((fit.slope + 1.0).abs() < 1e-3, "slope {}", fit.slope);
        assert!((fit.slope2 + 3.0).abs() < 1e-3, "slope2 {}", fit.slope2);
    }

    #[test]
    fn break_at_the_edge_is_rejected() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = broken_line(&x, 5.0);
        assert!(matches!(
            fit_segmented(&x, &y, 0.5, None),
            Err(StatError::InsufficientData { .. })
        ));
    }
}
