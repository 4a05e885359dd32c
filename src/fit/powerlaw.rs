//! 1D power-law and broken power-law fits on log10-transformed profiles.
use log::debug;
use serde::{Deserialize, Serialize};

use super::linear::fit_line;
use super::result::{FitMethod, FitModel, FitResult};
use super::segmented::fit_segmented;
use crate::error::{Result, StatError};

/// Options for [`fit_power_law`]. Cuts and break share the units of the
/// abscissa handed to the fitter.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerLawFitOptions {
    /// Smallest abscissa included in the fit.
    pub low_cut: Option<f64>,
    /// Largest abscissa included in the fit.
    pub high_cut: Option<f64>,
    /// Initial break position. `None` fits a single power law.
    pub brk: Option<f64>,
    /// Weight points by their log-space variance (needs per-point stddev).
    pub weighted: bool,
}

impl PowerLawFitOptions {
    pub fn with_cuts(mut self, low_cut: Option<f64>, high_cut: Option<f64>) -> Self {
        self.low_cut = low_cut;
        self.high_cut = high_cut;
        self
    }

    pub fn with_break(mut self, brk: f64) -> Self {
        self.brk = Some(brk);
        self
    }

    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }
}

/// Points surviving the cuts, already in log10 space.
#[derive(Clone, Debug, Default)]
pub struct LogPoints {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub weights: Option<Vec<f64>>,
}

impl LogPoints {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Select points inside the cuts with positive finite `x` and `y`, and move
/// them to log10 space.
pub fn select_log_points(
    x: &[f64],
    y: &[f64],
    stddev: Option<&[f64]>,
    opts: &PowerLawFitOptions,
) -> Result<LogPoints> {
    if x.len() != y.len() {
        return Err(StatError::ShapeMismatch {
            expected: vec![x.len()],
            found: vec![y.len()],
        });
    }
    if opts.weighted && stddev.is_none() {
        return Err(StatError::invalid(
            "weighted",
            "weighted fit requires per-point standard deviations",
        ));
    }
    let low = opts.low_cut.unwrap_or(f64::NEG_INFINITY);
    let high = opts.high_cut.unwrap_or(f64::INFINITY);

    let mut points = LogPoints {
        weights: opts.weighted.then(Vec::new),
        ..LogPoints::default()
    };
    for (i, (&xi, &yi)) in x.iter().zip(y.iter()).enumerate() {
        if !(xi.is_finite() && yi.is_finite() && xi > 0.0 && yi > 0.0) {
            continue;
        }
        if xi < low || xi > high {
            continue;
        }
        if let (Some(weights), Some(sd)) = (points.weights.as_mut(), stddev) {
            let sigma_log = sd.get(i).copied().unwrap_or(f64::NAN) / (yi * std::f64::consts::LN_10);
            if !(sigma_log.is_finite() && sigma_log > 0.0) {
                continue;
            }
            weights.push(1.0 / (sigma_log * sigma_log));
        }
        points.x.push(xi.log10());
        points.y.push(yi.log10());
    }
    Ok(points)
}

/// Fit `log10 y = intercept + slope·log10 x`, or a broken version when
/// `opts.brk` is set.
///
/// Parameters are `[intercept, slope]` or
/// `[intercept, slope, slope2, log_break]`.
pub fn fit_power_law(
    x: &[f64],
    y: &[f64],
    stddev: Option<&[f64]>,
    opts: &PowerLawFitOptions,
) -> Result<FitResult> {
    let points = select_log_points(x, y, stddev, opts)?;
    let weights = points.weights.as_deref();

    if let Some(brk) = opts.brk {
        if !(brk > 0.0) {
            return Err(StatError::invalid("brk", "break must be positive"));
        }
        let seg = fit_segmented(&points.x, &points.y, brk.log10(), weights)?;
        return Ok(FitResult::new(
            FitModel::BrokenLinear,
            FitMethod::Segmented,
            &["intercept", "slope", "slope2", "log_break"],
            &[seg.intercept, seg.slope, seg.slope2, seg.brk],
            &seg.stderrs,
            seg.nobs,
        ));
    }

    if points.len() < 2 {
        return Err(StatError::InsufficientData {
            context: "power-law fit",
            needed: 2,
            found: points.len(),
        });
    }
    let line = fit_line(&points.x, &points.y, weights)?;
    let stderrs = line.stderrs();
    debug!(
        "power-law fit on {} points: slope={:.4} +/- {:.4}",
        points.len(),
        line.params[1],
        stderrs[1]
    );
    let method = if weights.is_some() {
        FitMethod::WeightedLeastSquares
    } else {
        FitMethod::OrdinaryLeastSquares
    };
    Ok(FitResult::new(
        FitModel::Linear,
        method,
        &["intercept", "slope"],
        &[line.params[0], line.params[1]],
        &stderrs,
        line.nobs,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 10f64.powf(lo + (hi - lo) * i as f64 / (n - 1) as f64))
            .collect()
    }

    #[test]
    fn exact_power_law_is_recovered() {
        let x = logspace(-2.0, 0.0, 30);
        let y: Vec<f64> = x.iter().map(|v| 5.0 * v.powf(-2.7)).collect();
        let fit = fit_power_law(&x, &y, None, &PowerLawFitOptions::default()).unwrap();
        assert!((fit.slope() + 2.7).abs() < 1e-10);
        assert!((fit.value("intercept") - 5f64.log10()).abs() < 1e-10);
        assert_eq!(fit.model, FitModel::Linear);
    }

    #[test]
    fn cuts_exclude_points() {
        let x = logspace(-2.0, 0.0, 30);
        let y: Vec<f64> = x
            .iter()
            .map(|&v| if v > 0.1 { 1e6 } else { v.powf(-1.0) })
            .collect();
        let opts = PowerLawFitOptions::default().with_cuts(None, Some(0.1));
        let fit = fit_power_law(&x, &y, None, &opts).unwrap();
        assert!((fit.slope() + 1.0).abs() < 1e-10);
    }

    #[test]
    fn too_few_points_after_cuts() {
        let x = logspace(-2.0, 0.0, 10);
        let y = x.clone();
        let opts = PowerLawFitOptions::default().with_cuts(Some(0.9), None);
        assert!(matches!(
            fit_power_law(&x, &y, None, &opts),
            Err(StatError::InsufficientData { .. })
        ));
    }

    #[test]
    fn weighted_fit_requires_stddev() {
        let x = logspace(-2.0, 0.0, 10);
        let opts = PowerLawFitOptions::default().weighted(true);
        assert!(fit_power_law(&x, &x, None, &opts).is_err());
        let sd = vec![0.01; 10];
        let fit = fit_power_law(&x, &x, Some(&sd), &opts).unwrap();
        assert_eq!(fit.method, FitMethod::WeightedLeastSquares);
        assert!((fit.slope() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn broken_power_law_reports_both_slopes() {
        let x = logspace(-2.0, 0.0, 50);
        let brk: f64 = 0.07;
        let y: Vec<f64> = x
            .iter()
            .map(|&v| if v <= brk { v.powf(-1.5) } else { brk.powf(-1.5) * (v / brk).powf(-3.0) })
            .collect();
        let opts = PowerLawFitOptions::default().with_break(0.1);
        let fit = fit_power_law(&x, &y, None, &opts).unwrap();
        assert_eq!(fit.model, FitModel::BrokenLinear);
        assert!((fit.slope() + 1.5).abs() < 1e-3, "slope {}", fit.slope());
        assert!((fit.value("slope2") + 3.0).abs() < 1e-3);
        assert!((10f64.powf(fit.value("log_break")) - brk).abs() < 1e-3);
    }
}
