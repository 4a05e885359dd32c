//! Levenberg–Marquardt for small dense nonlinear least-squares problems.
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatError};

/// A residual vector and its Jacobian with respect to the parameters.
pub trait LeastSquaresProblem {
    /// Residuals `model(p) − data`.
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;
    /// `∂residual_i / ∂p_j`.
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LevMarOptions {
    pub max_iters: usize,
    pub initial_lambda: f64,
    pub tolerance: f64,
}

impl Default for LevMarOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            initial_lambda: 1e-3,
            tolerance: 1e-12,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LevMarReport {
    pub params: DVector<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
    /// `s²·(JᵀJ)⁻¹`; `None` when singular or without residual freedom.
    pub covariance: Option<DMatrix<f64>>,
}

const LAMBDA_MAX: f64 = 1e16;
const DIAG_EPS: f64 = 1e-12;

pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    initial: DVector<f64>,
    opts: &LevMarOptions,
) -> Result<LevMarReport> {
    let mut params = initial;
    let mut resid = problem.residuals(&params);
    let mut cost = resid.norm_squared();
    if !cost.is_finite() {
        return Err(StatError::NonFiniteInput {
            context: "Levenberg-Marquardt initial residuals",
        });
    }
    let n = resid.len();
    let p = params.len();
    let mut lambda = opts.initial_lambda;
    let mut converged = false;
    let mut iterations = 0;

    'outer: for iter in 0..opts.max_iters {
        iterations = iter + 1;
        let jac = problem.jacobian(&params);
        let jtj = jac.transpose() * &jac;
        let grad = jac.transpose() * &resid;

        loop {
            let mut damped = jtj.clone();
            for i in 0..p {
                damped[(i, i)] += lambda * (jtj[(i, i)] + DIAG_EPS);
            }
            let step = match damped.cholesky() {
                Some(chol) => chol.solve(&(-&grad)),
                None => {
                    lambda *= 10.0;
                    if lambda > LAMBDA_MAX {
                        break 'outer;
                    }
                    continue;
                }
            };
            let candidate = &params + &step;
            let cand_resid = problem.residuals(&candidate);
            let cand_cost = cand_resid.norm_squared();

            if cand_cost.is_finite() && cand_cost <= cost {
                let decrease = cost - cand_cost;
                let small_step = step.norm() < opts.tolerance * (params.norm() + opts.tolerance);
                params = candidate;
                resid = cand_resid;
                let small_decrease = decrease <= opts.tolerance * cost.max(f64::MIN_POSITIVE);
                cost = cand_cost;
                lambda = (lambda / 10.0).max(1e-15);
                if small_step || small_decrease {
                    converged = true;
                    break 'outer;
                }
                break;
            }
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                // No downhill step exists at any damping: a stationary point.
                converged = true;
                break 'outer;
            }
        }
    }

    let covariance = if n > p {
        let jac = problem.jacobian(&params);
        let s2 = cost / (n - p) as f64;
        (jac.transpose() * &jac).try_inverse().map(|inv| inv * s2)
    } else {
        None
    };

    debug!(
        "levenberg_marquardt: {iterations} iterations, cost={cost:.4e}, converged={converged}"
    );

    Ok(LevMarReport {
        params,
        cost,
        iterations,
        converged,
        covariance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exponential {
        t: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for Exponential {
        fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.t.len(),
                self.t
                    .iter()
                    .zip(self.y.iter())
                    .map(|(&t, &y)| p[0] * (p[1] * t).exp() - y),
            )
        }

        fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_fn(self.t.len(), 2, |i, j| {
                let e = (p[1] * self.t[i]).exp();
                if j == 0 {
                    e
                } else {
                    p[0] * self.t[i] * e
                }
            })
        }
    }

    #[test]
    fn fits_an_exponential_decay() {
        let t: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
        let y: Vec<f64> = t.iter().map(|&t| 3.0 * (-0.7 * t).exp()).collect();
        let problem = Exponential { t, y };
        let report = levenberg_marquardt(
            &problem,
            DVector::from_vec(vec![1.0, -0.1]),
            &LevMarOptions::default(),
        )
        .unwrap();
        assert!(report.converged);
        assert!((report.params[0] - 3.0).abs() < 1e-6, "{:?}", report.params);
        assert!((report.params[1] + 0.7).abs() < 1e-6);
        assert!(report.covariance.is_some());
    }
}
