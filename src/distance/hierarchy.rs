//! Distances between the dendrogram statistics of two fields.
use log::debug;
use serde::{Deserialize, Serialize};

use super::powerlaw::{slope_t_statistic, PowerLawStatistic};
use crate::error::{Result, StatError};
use crate::hierarchy::{
    common_histogram_bins, ecdf, hellinger, histogram_on_edges, standardize, HierarchyStats,
};

/// Number of histogram bins per level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramBins {
    /// `floor(sqrt((n1 + n2) / 2))` from the two feature counts.
    #[default]
    Best,
    Fixed(usize),
}

/// Padded, normalised histograms of both datasets at every compared level.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramComparison {
    pub nbins: Vec<usize>,
    pub bins: Vec<Vec<f64>>,
    pub histograms1: Vec<Vec<f64>>,
    pub histograms2: Vec<Vec<f64>>,
    pub ecdf1: Vec<Vec<f64>>,
    pub ecdf2: Vec<Vec<f64>>,
    pub distance: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyDistanceReport {
    pub histogram_distance: f64,
    pub numfeature_distance: f64,
    /// Last level index compared (inclusive).
    pub cutoff: usize,
}

/// Compares two computed [`HierarchyStats`] without copying them.
#[derive(Debug)]
pub struct HierarchyDistance<'a> {
    first: &'a HierarchyStats,
    second: &'a HierarchyStats,
    nbins: HistogramBins,
    cutoff: usize,
    histograms: Option<HistogramComparison>,
}

impl<'a> HierarchyDistance<'a> {
    /// `cutoff` is the last level where both datasets still have more than
    /// `min_features` structures; the levels before it take part in the
    /// histogram distance.
    pub fn new(
        first: &'a HierarchyStats,
        second: &'a HierarchyStats,
        nbins: HistogramBins,
        min_features: usize,
    ) -> Result<Self> {
        let last_above = |stats: &HierarchyStats| -> Result<usize> {
            stats
                .levels()?
                .iter()
                .rposition(|l| l.feature_count > min_features)
                .ok_or_else(|| {
                    StatError::invalid(
                        "min_features",
                        format!(
                            "no threshold keeps more than {min_features} features; lower min_features or change the thresholds"
                        ),
                    )
                })
        };
        let cutoff = last_above(first)?.min(last_above(second)?);
        if let HistogramBins::Fixed(0) = nbins {
            return Err(StatError::invalid("nbins", "must be at least 1"));
        }
        debug!("hierarchy distance: comparing levels 0..{cutoff}");
        Ok(Self {
            first,
            second,
            nbins,
            cutoff,
            histograms: None,
        })
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    pub fn histograms(&self) -> Option<&HistogramComparison> {
        self.histograms.as_ref()
    }

    /// t-statistic between the two tail slopes.
    pub fn numfeature_distance(&self) -> Result<f64> {
        let a = self.first.power_law_fit()?;
        let b = self.second.power_law_fit()?;
        Ok(slope_t_statistic(a.slope(), a.slope_err(), b.slope(), b.slope_err()))
    }

    /// Mean Hellinger distance between standardised peak-value histograms.
    pub fn histogram_distance(&mut self) -> Result<f64> {
        if self.cutoff == 0 {
            return Err(StatError::InsufficientData {
                context: "histogram distance levels",
                needed: 1,
                found: 0,
            });
        }
        let levels1 = &self.first.levels()?[..self.cutoff];
        let levels2 = &self.second.levels()?[..self.cutoff];

        let nbins: Vec<usize> = levels1
            .iter()
            .zip(levels2)
            .map(|(l1, l2)| match self.nbins {
                HistogramBins::Best => {
                    let mean = (l1.feature_count + l2.feature_count) as f64 / 2.0;
                    (mean.sqrt().floor() as usize).max(1)
                }
                HistogramBins::Fixed(n) => n,
            })
            .collect();
        let width = nbins.iter().copied().max().unwrap_or(1);

        let mut bins = Vec::with_capacity(nbins.len());
        let mut hists1 = Vec::with_capacity(nbins.len());
        let mut hists2 = Vec::with_capacity(nbins.len());
        for ((l1, l2), &nbin) in levels1.iter().zip(levels2).zip(&nbins) {
            let z1 = standardize(&l1.peak_values);
            let z2 = standardize(&l2.peak_values);
            let edges = common_histogram_bins(&z1, &z2, nbin);
            hists1.push(padded_density(&z1, &edges, width));
            hists2.push(padded_density(&z2, &edges, width));
            bins.push(edges);
        }

        let per_level: Vec<f64> = hists1
            .iter()
            .zip(&hists2)
            .map(|(p, q)| hellinger(p, q))
            .collect();
        let distance = per_level.iter().sum::<f64>() / per_level.len() as f64;
        debug!("histogram distance over {} levels: {distance:.4}", per_level.len());

        let comparison = HistogramComparison {
            ecdf1: hists1.iter().map(|h| ecdf(h)).collect(),
            ecdf2: hists2.iter().map(|h| ecdf(h)).collect(),
            nbins,
            bins,
            histograms1: hists1,
            histograms2: hists2,
            distance,
        };
        Ok(self.histograms.insert(comparison).distance)
    }

    /// Both distances.
    pub fn distance_metric(&mut self) -> Result<HierarchyDistanceReport> {
        let histogram_distance = self.histogram_distance()?;
        let numfeature_distance = self.numfeature_distance()?;
        Ok(HierarchyDistanceReport {
            histogram_distance,
            numfeature_distance,
            cutoff: self.cutoff,
        })
    }
}

/// Density histogram padded with NaN to `width` bins and renormalised to
/// unit sum.
fn padded_density(values: &[f64], edges: &[f64], width: usize) -> Vec<f64> {
    let mut hist = histogram_on_edges(values, edges, true);
    hist.resize(width, f64::NAN);
    let total: f64 = hist.iter().filter(|v| !v.is_nan()).sum();
    if total > 0.0 {
        for v in hist.iter_mut() {
            *v /= total;
        }
    }
    hist
}
