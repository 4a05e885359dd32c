//! Log-space elliptical power law over 2D spatial frequencies.
//!
//! `model(x, y) = A + ½·γ·log10(q²u² + v²)` with `u = x·cosθ − y·sinθ`,
//! `v = x·sinθ + y·cosθ` and `q = 1 / (1 + e^(−e_t))`. Parameters are
//! ordered `[logamplitude, ellip_transf, theta, gamma]`.
use std::f64::consts::{LN_10, PI};

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::levmar::{levenberg_marquardt, LeastSquaresProblem, LevMarOptions, LevMarReport};
use super::result::{FitMethod, FitModel, FitResult};
use super::stats::percentile;
use super::transform::{inverse_interval_transform, inverse_interval_transform_stderr};
use crate::error::{Result, StatError};

pub const PARAM_NAMES: [&str; 4] = ["logamplitude", "ellip_transf", "theta", "gamma"];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EllipticalFitOptions {
    /// Estimate errors by bootstrap instead of the fit covariance.
    pub bootstrap: bool,
    pub niters: usize,
    /// Central probability mass of the percentile interval.
    pub alpha: f64,
    /// RNG seed for the bootstrap; entropy-seeded when absent.
    pub seed: Option<u64>,
    pub levmar: LevMarOptions,
}

impl Default for EllipticalFitOptions {
    fn default() -> Self {
        Self {
            bootstrap: true,
            niters: 100,
            alpha: 0.6827,
            seed: None,
            levmar: LevMarOptions::default(),
        }
    }
}

impl EllipticalFitOptions {
    pub fn with_bootstrap(mut self, bootstrap: bool, niters: usize) -> Self {
        self.bootstrap = bootstrap;
        self.niters = niters;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Ellipticity in `(0, 1)` from its real-line transform.
pub fn ellipticity(ellip_transf: f64) -> f64 {
    inverse_interval_transform(ellip_transf, 0.0, 1.0)
}

/// Evaluate the model at one frequency. The zero-frequency point is
/// non-finite and evaluates to 0.
pub fn log_elliptical_powerlaw(x: f64, y: f64, params: &[f64]) -> f64 {
    let (logamp, e_t, theta, gamma) = (params[0], params[1], params[2], params[3]);
    let q = ellipticity(e_t);
    let (s, c) = theta.sin_cos();
    let u = x * c - y * s;
    let v = x * s + y * c;
    let value = logamp + 0.5 * gamma * (q * q * u * u + v * v).log10();
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

struct EllipticalProblem<'a> {
    x: &'a [f64],
    y: &'a [f64],
    values: &'a [f64],
}

impl EllipticalProblem<'_> {
    fn model(&self, p: &DVector<f64>) -> Vec<f64> {
        let params = p.as_slice();
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| log_elliptical_powerlaw(x, y, params))
            .collect()
    }

    fn abs_residual_sum(&self, p: &DVector<f64>) -> f64 {
        self.model(p)
            .iter()
            .zip(self.values.iter())
            .map(|(m, v)| (v - m).abs())
            .sum()
    }
}

impl LeastSquaresProblem for EllipticalProblem<'_> {
    fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
        let model = self.model(p);
        DVector::from_iterator(
            model.len(),
            model.iter().zip(self.values.iter()).map(|(m, v)| m - v),
        )
    }

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
        let (e_t, theta, gamma) = (p[1], p[2], p[3]);
        let q = ellipticity(e_t);
        let (s, c) = theta.sin_cos();
        let mut jac = DMatrix::zeros(self.x.len(), 4);
        for (i, (&x, &y)) in self.x.iter().zip(self.y.iter()).enumerate() {
            let u = x * c - y * s;
            let v = x * s + y * c;
            let sum = q * q * u * u + v * v;
            if !(sum > 0.0) || !sum.is_finite() {
                // Zero-frequency point: the model is clamped there.
                continue;
            }
            let scale = 0.5 * gamma / (sum * LN_10);
            jac[(i, 0)] = 1.0;
            jac[(i, 1)] = scale * 2.0 * q * u * u * q * (1.0 - q);
            jac[(i, 2)] = scale * 2.0 * u * v * (1.0 - q * q);
            jac[(i, 3)] = 0.5 * sum.log10();
        }
        jac
    }
}

/// Fit the elliptical power law to `values` (log10 power) sampled at
/// frequencies `(x, y)`, starting from `p0`.
///
/// Two starts are tried, `θ₀` and `(θ₀ + π/2) mod π`; the one with the
/// smaller total absolute residual wins, the unshifted start on ties.
pub fn fit_elliptical_powerlaw(
    values: &[f64],
    x: &[f64],
    y: &[f64],
    p0: [f64; 4],
    opts: &EllipticalFitOptions,
) -> Result<FitResult> {
    if values.len() != x.len() || values.len() != y.len() {
        return Err(StatError::ShapeMismatch {
            expected: vec![values.len()],
            found: vec![x.len(), y.len()],
        });
    }
    if values.iter().chain(x).chain(y).any(|v| !v.is_finite()) {
        return Err(StatError::NonFiniteInput {
            context: "elliptical power-law fit",
        });
    }
    if values.len() <= PARAM_NAMES.len() {
        return Err(StatError::InsufficientData {
            context: "elliptical power-law fit",
            needed: PARAM_NAMES.len() + 1,
            found: values.len(),
        });
    }

    let problem = EllipticalProblem { x, y, values };
    let start = DVector::from_row_slice(&p0);
    let mut flipped = start.clone();
    flipped[2] = (p0[2] + PI / 2.0).rem_euclid(PI);

    let fit = levenberg_marquardt(&problem, start, &opts.levmar)?;
    let fit_flipped = levenberg_marquardt(&problem, flipped, &opts.levmar)?;
    let resid = problem.abs_residual_sum(&fit.params);
    let resid_flipped = problem.abs_residual_sum(&fit_flipped.params);
    let best = if resid > resid_flipped {
        debug!("elliptical fit: using the theta-flipped start ({resid_flipped:.4e} < {resid:.4e})");
        fit_flipped
    } else {
        fit
    };

    let mut params: Vec<f64> = best.params.iter().copied().collect();
    params[2] = params[2].rem_euclid(PI);

    let (stderrs, method) = if opts.bootstrap {
        (bootstrap_stderrs(&problem, &best, params[2], opts)?, FitMethod::LevMarBootstrap)
    } else {
        let errs = match &best.covariance {
            Some(cov) => (0..4).map(|i| cov[(i, i)].abs().sqrt()).collect(),
            None => {
                warn!("covariance matrix calculation failed; elliptical fit errors are NaN");
                vec![f64::NAN; 4]
            }
        };
        (errs, FitMethod::LevMarCovariance)
    };

    debug!(
        "elliptical fit: gamma={:.3} ellip={:.3} theta={:.3}",
        params[3],
        ellipticity(params[1]),
        params[2]
    );

    Ok(FitResult::new(
        FitModel::EllipticalPowerLaw,
        method,
        &PARAM_NAMES,
        &params,
        &stderrs,
        values.len(),
    ))
}

/// Ellipticity and its propagated error from a fitted elliptical model.
pub fn ellipticity_with_error(fit: &FitResult) -> (f64, f64) {
    let e_t = fit.value("ellip_transf");
    let e_t_err = fit.stderr("ellip_transf");
    (
        ellipticity(e_t),
        inverse_interval_transform_stderr(e_t_err, e_t, 0.0, 1.0),
    )
}

/// Resample residuals around the best model, refit, and return the
/// half-width of the central `alpha` percentile interval per parameter.
fn bootstrap_stderrs(
    problem: &EllipticalProblem<'_>,
    best: &LevMarReport,
    best_theta: f64,
    opts: &EllipticalFitOptions,
) -> Result<Vec<f64>> {
    if opts.niters < 2 {
        return Err(StatError::invalid("niters", "bootstrap needs at least 2 iterations"));
    }
    if !(opts.alpha > 0.0 && opts.alpha < 1.0) {
        return Err(StatError::invalid("alpha", "must lie in (0, 1)"));
    }
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let model = problem.model(&best.params);
    let resid: Vec<f64> = problem
        .values
        .iter()
        .zip(model.iter())
        .map(|(v, m)| v - m)
        .collect();
    let n = resid.len();

    let mut samples: [Vec<f64>; 4] = Default::default();
    for _ in 0..opts.niters {
        let resampled: Vec<f64> = model
            .iter()
            .map(|m| m + resid[rng.gen_range(0..n)])
            .collect();
        let boot = EllipticalProblem {
            x: problem.x,
            y: problem.y,
            values: &resampled,
        };
        let report = levenberg_marquardt(&boot, best.params.clone(), &opts.levmar)?;
        for (k, sample) in samples.iter_mut().enumerate() {
            let mut value = report.params[k];
            if k == 2 {
                value -= PI * ((value - best_theta) / PI).round();
            }
            sample.push(value);
        }
    }

    let lo = 100.0 * (0.5 - opts.alpha / 2.0);
    let hi = 100.0 * (0.5 + opts.alpha / 2.0);
    Ok(samples
        .iter()
        .map(|s| 0.5 * (percentile(s, hi) - percentile(s, lo)))
        .collect())
}
