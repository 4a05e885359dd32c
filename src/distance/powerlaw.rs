//! Distances between two fitted power laws.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fit::FitResult;
use crate::spectrum::{Mvc, PowerSpectrum, Vca};

/// A statistic whose main summary is a fitted power-law index.
pub trait PowerLawStatistic {
    /// The fit whose slope is compared; `NotComputed` before fitting.
    fn power_law_fit(&self) -> Result<&FitResult>;
}

/// `|s1 − s2| / sqrt(e1² + e2²)`. Identical slopes give 0 regardless of
/// their errors.
pub fn slope_t_statistic(slope1: f64, err1: f64, slope2: f64, err2: f64) -> f64 {
    if slope1 == slope2 {
        return 0.0;
    }
    (slope1 - slope2).abs() / (err1 * err1 + err2 * err2).sqrt()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlopeComparison {
    pub slope1: f64,
    pub slope1_err: f64,
    pub slope2: f64,
    pub slope2_err: f64,
    pub distance: f64,
}

/// t-statistic between the slopes of two borrowed statistics.
#[derive(Debug)]
pub struct PowerLawDistance<'a, S: PowerLawStatistic> {
    first: &'a S,
    second: &'a S,
}

impl<'a, S: PowerLawStatistic> PowerLawDistance<'a, S> {
    pub fn new(first: &'a S, second: &'a S) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &'a S {
        self.first
    }

    pub fn second(&self) -> &'a S {
        self.second
    }

    pub fn compare(&self) -> Result<SlopeComparison> {
        let a = self.first.power_law_fit()?;
        let b = self.second.power_law_fit()?;
        let distance = slope_t_statistic(a.slope(), a.slope_err(), b.slope(), b.slope_err());
        debug!(
            "power-law distance: {:.4} vs {:.4} -> {:.4}",
            a.slope(),
            b.slope(),
            distance
        );
        Ok(SlopeComparison {
            slope1: a.slope(),
            slope1_err: a.slope_err(),
            slope2: b.slope(),
            slope2_err: b.slope_err(),
            distance,
        })
    }

    pub fn distance_metric(&self) -> Result<f64> {
        Ok(self.compare()?.distance)
    }
}

pub type PowerSpectrumDistance<'a> = PowerLawDistance<'a, PowerSpectrum>;
pub type MvcDistance<'a> = PowerLawDistance<'a, Mvc>;
pub type VcaDistance<'a> = PowerLawDistance<'a, Vca>;
