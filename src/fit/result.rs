use serde::{Deserialize, Serialize};

use super::elliptical::log_elliptical_powerlaw;

/// Functional form a [`FitResult`] evaluates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitModel {
    /// `y = intercept + slope·x` in log10 space.
    Linear,
    /// Two joined segments meeting at `log_break`.
    BrokenLinear,
    /// Log-space elliptical power law over 2D frequencies.
    EllipticalPowerLaw,
}

/// How the parameters and their errors were obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    OrdinaryLeastSquares,
    WeightedLeastSquares,
    Segmented,
    /// Levenberg–Marquardt with covariance-based errors.
    LevMarCovariance,
    /// Levenberg–Marquardt with bootstrap percentile errors.
    LevMarBootstrap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitParameter {
    pub name: String,
    #[serde(deserialize_with = "crate::field::io::nan_as_null::f64")]
    pub value: f64,
    /// NaN when no error estimate is available.
    #[serde(deserialize_with = "crate::field::io::nan_as_null::f64")]
    pub stderr: f64,
}

/// Named parameters, their standard errors, and the model they evaluate.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitResult {
    pub model: FitModel,
    pub method: FitMethod,
    pub parameters: Vec<FitParameter>,
    /// Number of points the fit used.
    pub nobs: usize,
}

impl FitResult {
    pub(crate) fn new(
        model: FitModel,
        method: FitMethod,
        names: &[&str],
        values: &[f64],
        stderrs: &[f64],
        nobs: usize,
    ) -> Self {
        debug_assert_eq!(names.len(), values.len());
        debug_assert_eq!(names.len(), stderrs.len());
        let parameters = names
            .iter()
            .zip(values.iter().zip(stderrs.iter()))
            .map(|(name, (&value, &stderr))| FitParameter {
                name: (*name).to_string(),
                value,
                stderr,
            })
            .collect();
        Self {
            model,
            method,
            parameters,
            nobs,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&FitParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Value of `name`, NaN if the model has no such parameter.
    pub fn value(&self, name: &str) -> f64 {
        self.parameter(name).map_or(f64::NAN, |p| p.value)
    }

    pub fn stderr(&self, name: &str) -> f64 {
        self.parameter(name).map_or(f64::NAN, |p| p.stderr)
    }

    pub fn values(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.value).collect()
    }

    pub fn stderrs(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.stderr).collect()
    }

    /// Power-law index. For a broken fit this is the slope below the break.
    pub fn slope(&self) -> f64 {
        match self.model {
            FitModel::EllipticalPowerLaw => self.value("gamma"),
            _ => self.value("slope"),
        }
    }

    pub fn slope_err(&self) -> f64 {
        match self.model {
            FitModel::EllipticalPowerLaw => self.stderr("gamma"),
            _ => self.stderr("slope"),
        }
    }

    /// Evaluate a 1D model at `log_x` (log10 abscissa), returning log10 y.
    ///
    /// Returns NaN for the 2D elliptical model.
    pub fn evaluate(&self, log_x: f64) -> f64 {
        let a = self.value("intercept");
        let b = self.value("slope");
        match self.model {
            FitModel::Linear => a + b * log_x,
            FitModel::BrokenLinear => {
                let psi = self.value("log_break");
                let c = self.value("slope2") - b;
                a + b * log_x + c * (log_x - psi).max(0.0)
            }
            FitModel::EllipticalPowerLaw => f64::NAN,
        }
    }

    /// Evaluate the elliptical model at frequency `(x, y)`.
    ///
    /// Returns NaN for 1D models.
    pub fn evaluate_2d(&self, x: f64, y: f64) -> f64 {
        match self.model {
            FitModel::EllipticalPowerLaw => log_elliptical_powerlaw(x, y, &self.values()),
            _ => f64::NAN,
        }
    }
}
