//! Feature counts and peak-value distributions of a hierarchy pruned over
//! an ascending sequence of contrast thresholds.
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::backend::{
    default_backend, ensure_ascending, Connectivity, DendroParams, Hierarchy, HierarchyBackend,
};
use super::histogram::{histogram, Histogram};
use super::window::std_window;
use crate::distance::PowerLawStatistic;
use crate::error::{Result, StatError};
use crate::field::io::{read_json_file, write_json_file};
use crate::field::{Field, FieldData, FieldHeader};
use crate::fit::{fit_line, FitMethod, FitModel, FitResult};

/// Snapshot taken after building or pruning to one threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyLevel {
    pub threshold: f64,
    pub feature_count: usize,
    pub peak_values: Vec<f64>,
}

/// Power-law fit to the tail of feature count versus threshold.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailFit {
    /// Threshold at which the tail starts.
    pub break_delta: f64,
    pub log_deltas: Vec<f64>,
    pub log_counts: Vec<f64>,
    pub fit: FitResult,
}

/// Everything derived by [`HierarchyStats`]; what gets persisted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyResults {
    pub levels: Vec<HierarchyLevel>,
    pub tail: Option<TailFit>,
    pub histograms: Option<Vec<Histogram>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyRunOptions {
    /// Wrap structures around the spatial axes.
    pub periodic: bool,
    /// Odd window size of the break search.
    pub window: usize,
    pub make_histograms: bool,
    /// Levels with fewer peak values get an empty histogram.
    pub min_number: usize,
    /// Histogram bin count; `round(sqrt(N))` when absent.
    pub bins: Option<usize>,
}

impl Default for HierarchyRunOptions {
    fn default() -> Self {
        Self {
            periodic: false,
            window: 5,
            make_histograms: true,
            min_number: 10,
            bins: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedHierarchyStats {
    min_deltas: Vec<f64>,
    params: DendroParams,
    header: FieldHeader,
    results: HierarchyResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<FieldData>,
}

/// Dendrogram statistics of one field.
#[derive(Debug)]
pub struct HierarchyStats {
    data: Option<FieldData>,
    header: FieldHeader,
    min_deltas: Vec<f64>,
    params: DendroParams,
    backend: Option<Box<dyn HierarchyBackend>>,
    results: HierarchyResults,
}

impl HierarchyStats {
    /// Statistics over `min_deltas` (default `[params.min_delta]`) using the
    /// compiled-in backend.
    pub fn new(field: Field, min_deltas: Option<Vec<f64>>, params: DendroParams) -> Result<Self> {
        let backend = default_backend()?;
        Self::with_backend(field, min_deltas, params, backend)
    }

    pub fn with_backend(
        field: Field,
        min_deltas: Option<Vec<f64>>,
        params: DendroParams,
        backend: Box<dyn HierarchyBackend>,
    ) -> Result<Self> {
        let min_deltas = min_deltas.unwrap_or_else(|| vec![params.min_delta]);
        ensure_ascending(&min_deltas)?;
        let (data, header) = field.into_parts();
        Ok(Self {
            data: Some(data),
            header,
            min_deltas,
            params,
            backend: Some(backend),
            results: HierarchyResults::default(),
        })
    }

    pub fn min_deltas(&self) -> &[f64] {
        &self.min_deltas
    }

    pub fn params(&self) -> &DendroParams {
        &self.params
    }

    pub fn header(&self) -> &FieldHeader {
        &self.header
    }

    /// `None` when loaded from results saved without the data.
    pub fn data(&self) -> Option<&FieldData> {
        self.data.as_ref()
    }

    pub fn results(&self) -> &HierarchyResults {
        &self.results
    }

    pub fn levels(&self) -> Result<&[HierarchyLevel]> {
        if self.results.levels.is_empty() {
            return Err(StatError::NotComputed {
                what: "hierarchy levels",
            });
        }
        Ok(&self.results.levels)
    }

    /// Feature count per threshold.
    pub fn numfeatures(&self) -> Vec<usize> {
        self.results.levels.iter().map(|l| l.feature_count).collect()
    }

    /// Peak values per threshold.
    pub fn values(&self) -> Vec<&[f64]> {
        self.results
            .levels
            .iter()
            .map(|l| l.peak_values.as_slice())
            .collect()
    }

    pub fn tail(&self) -> Option<&TailFit> {
        self.results.tail.as_ref()
    }

    pub fn histograms(&self) -> Option<&[Histogram]> {
        self.results.histograms.as_deref()
    }

    pub fn tail_slope(&self) -> f64 {
        self.tail().map_or(f64::NAN, |t| t.fit.slope())
    }

    pub fn tail_slope_err(&self) -> f64 {
        self.tail().map_or(f64::NAN, |t| t.fit.slope_err())
    }

    /// Build the hierarchy at the first threshold and prune through the
    /// rest, recording a level after each step.
    pub fn compute(&mut self, periodic: bool) -> Result<&[HierarchyLevel]> {
        let backend = self.backend.as_ref().ok_or(StatError::MissingBackend)?;
        let data = self.data.as_ref().ok_or_else(|| {
            StatError::invalid("data", "field data was not kept with the saved results")
        })?;
        let connectivity = if periodic {
            Connectivity::periodic(self.header.spatial_axes())
        } else {
            Connectivity::default()
        };
        let params = DendroParams {
            min_delta: self.min_deltas[0],
            ..self.params.clone()
        };
        let mut hierarchy = backend.build(data, &params, &connectivity)?;
        self.compute_from(hierarchy.as_mut())
    }

    /// Record levels from a hierarchy already built at the first threshold.
    pub fn compute_from(&mut self, hierarchy: &mut dyn Hierarchy) -> Result<&[HierarchyLevel]> {
        ensure_ascending(&self.min_deltas)?;
        let mut levels = Vec::with_capacity(self.min_deltas.len());
        for (i, &delta) in self.min_deltas.iter().enumerate() {
            if i > 0 {
                hierarchy.prune(delta);
            }
            levels.push(HierarchyLevel {
                threshold: delta,
                feature_count: hierarchy.len(),
                peak_values: hierarchy.peak_values(),
            });
            debug!("hierarchy level {i}: delta={delta} features={}", hierarchy.len());
        }
        self.results = HierarchyResults {
            levels,
            ..HierarchyResults::default()
        };
        Ok(&self.results.levels)
    }

    /// Fit `log10 count` against `log10 threshold` from the variability
    /// break onward. Levels with at most one feature are excluded.
    ///
    /// Returns `Ok(None)` with a warning when there is nothing to fit.
    pub fn fit_tail(&mut self, window: usize) -> Result<Option<&TailFit>> {
        let levels = self.levels()?;
        if levels.len() == 1 {
            warn!("multiple thresholds are needed for the tail fit; only one was given");
            return Ok(None);
        }
        let (deltas, counts): (Vec<f64>, Vec<f64>) = levels
            .iter()
            .filter(|l| l.feature_count > 1)
            .map(|l| (l.threshold, l.feature_count as f64))
            .unzip();
        if counts.len() < 2 {
            warn!("fewer than two thresholds keep more than one feature; skipping the tail fit");
            return Ok(None);
        }
        let break_pos = std_window(&counts, window)?;
        let log_deltas: Vec<f64> = deltas[break_pos..].iter().map(|d| d.log10()).collect();
        let log_counts: Vec<f64> = counts[break_pos..].iter().map(|c| c.log10()).collect();
        if log_deltas.len() < 2 {
            warn!(
                "tail beyond the break at {} has a single point; skipping the fit",
                deltas[break_pos]
            );
            return Ok(None);
        }
        let line = fit_line(&log_deltas, &log_counts, None)?;
        let stderrs = line.stderrs();
        let fit = FitResult::new(
            FitModel::Linear,
            FitMethod::OrdinaryLeastSquares,
            &["intercept", "slope"],
            &[line.params[0], line.params[1]],
            &stderrs,
            line.nobs,
        );
        debug!(
            "tail fit: break at delta={} slope={:.3} +/- {:.3}",
            deltas[break_pos],
            fit.slope(),
            fit.slope_err()
        );
        let tail = TailFit {
            break_delta: deltas[break_pos],
            log_deltas,
            log_counts,
            fit,
        };
        Ok(Some(self.results.tail.insert(tail)))
    }

    /// One histogram of peak values per level; levels with fewer than
    /// `min_number` values get an empty placeholder.
    pub fn make_histograms(
        &mut self,
        min_number: usize,
        bins: Option<usize>,
    ) -> Result<&[Histogram]> {
        let hists: Vec<Histogram> = self
            .levels()?
            .iter()
            .map(|level| {
                let n = level.peak_values.len();
                if n < min_number || n == 0 {
                    return Histogram::placeholder();
                }
                let nbins = bins.unwrap_or_else(|| ((n as f64).sqrt().round() as usize).max(1));
                histogram(&level.peak_values, nbins)
            })
            .collect();
        Ok(self.results.histograms.insert(hists))
    }

    pub fn run(&mut self, opts: &HierarchyRunOptions) -> Result<&HierarchyResults> {
        self.compute(opts.periodic)?;
        self.fit_tail(opts.window)?;
        if opts.make_histograms {
            self.make_histograms(opts.min_number, opts.bins)?;
        }
        Ok(&self.results)
    }

    /// Persist results as JSON. The field itself is written only with
    /// `keep_data`.
    pub fn save_results(&self, path: &Path, keep_data: bool) -> Result<()> {
        let saved = SavedHierarchyStats {
            min_deltas: self.min_deltas.clone(),
            params: self.params.clone(),
            header: self.header.clone(),
            results: self.results.clone(),
            data: if keep_data { self.data.clone() } else { None },
        };
        write_json_file(path, &saved)
    }

    /// Restore statistics written by [`HierarchyStats::save_results`].
    ///
    /// The compiled-in backend is attached when available so a restored
    /// object with data can be recomputed.
    pub fn load_results(path: &Path) -> Result<Self> {
        let saved: SavedHierarchyStats = read_json_file(path)?;
        ensure_ascending(&saved.min_deltas)?;
        Ok(Self {
            data: saved.data,
            header: saved.header,
            min_deltas: saved.min_deltas,
            params: saved.params,
            backend: default_backend().ok(),
            results: saved.results,
        })
    }
}

impl PowerLawStatistic for HierarchyStats {
    fn power_law_fit(&self) -> Result<&FitResult> {
        self.tail().map(|t| &t.fit).ok_or(StatError::NotComputed {
            what: "hierarchy tail fit",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hierarchy replaying a fixed list of (count, peaks) per prune.
    #[derive(Debug)]
    struct Scripted {
        steps: Vec<Vec<f64>>,
        at: usize,
    }

    impl Hierarchy for Scripted {
        fn len(&self) -> usize {
            self.steps[self.at].len()
        }

        fn peak_values(&self) -> Vec<f64> {
            self.steps[self.at].clone()
        }

        fn prune(&mut self, _min_delta: f64) {
            self.at = (self.at + 1).min(self.steps.len() - 1);
        }
    }

    /// Backend for tests that feed levels through `compute_from`.
    #[derive(Debug)]
    struct Unused;

    impl HierarchyBackend for Unused {
        fn build(
            &self,
            _data: &FieldData,
            _params: &DendroParams,
            _connectivity: &Connectivity,
        ) -> Result<Box<dyn Hierarchy>> {
            Err(StatError::MissingBackend)
        }
    }

    fn stats(min_deltas: Vec<f64>) -> HierarchyStats {
        let field = Field::map(crate::field::Map2::new(4, 4));
        HierarchyStats::with_backend(
            field,
            Some(min_deltas),
            DendroParams::default(),
            Box::new(Unused),
        )
        .unwrap()
    }

    #[test]
    fn non_ascending_thresholds_fail_fast() {
        let field = Field::map(crate::field::Map2::new(4, 4));
        let err = HierarchyStats::with_backend(
            field,
            Some(vec![0.1, 0.05]),
            DendroParams::default(),
            Box::new(Unused),
        );
        assert!(matches!(err, Err(StatError::NonAscendingThresholds { .. })));
    }

    #[test]
    fn levels_are_independent_copies() {
        let mut s = stats(vec![0.1, 0.2, 0.3]);
        let mut h = Scripted {
            steps: vec![vec![3.0, 2.0, 1.0], vec![3.0, 2.0], vec![3.0]],
            at: 0,
        };
        s.compute_from(&mut h).unwrap();
        h.steps[0][0] = -1.0;
        assert_eq!(s.numfeatures(), vec![3, 2, 1]);
        assert_eq!(s.values()[0], &[3.0, 2.0, 1.0]);
    }

    #[test]
    fn single_threshold_tail_fit_is_a_no_op() {
        let mut s = stats(vec![0.1]);
        let mut h = Scripted {
            steps: vec![vec![1.0; 20]],
            at: 0,
        };
        s.compute_from(&mut h).unwrap();
        assert!(s.fit_tail(5).unwrap().is_none());
        assert!(s.power_law_fit().is_err());
    }

    #[test]
    fn tail_slope_follows_a_power_law_tail() {
        let deltas: Vec<f64> = (0..20).map(|i| 10f64.powf(-2.0 + 0.1 * i as f64)).collect();
        // flat at 1000 until index 6, then count ~ delta^-1.5
        let counts: Vec<usize> = deltas
            .iter()
            .enumerate()
            .map(|(i, d)| {
                if i < 6 {
                    1000
                } else {
                    (1000.0 * (d / deltas[6]).powf(-1.5)).round() as usize
                }
            })
            .collect();
        let mut s = stats(deltas);
        let mut h = Scripted {
            steps: counts.iter().map(|&c| vec![1.0; c]).collect(),
            at: 0,
        };
        s.compute_from(&mut h).unwrap();
        let tail = s.fit_tail(5).unwrap().expect("tail fit");
        assert!((tail.fit.slope() + 1.5).abs() < 0.1, "slope {}", tail.fit.slope());
    }

    #[test]
    fn sparse_levels_get_placeholder_histograms() {
        let mut s = stats(vec![0.1, 0.2]);
        let mut h = Scripted {
            steps: vec![(0..16).map(f64::from).collect(), vec![1.0, 2.0]],
            at: 0,
        };
        s.compute_from(&mut h).unwrap();
        let hists = s.make_histograms(10, None).unwrap();
        assert_eq!(hists[0].counts.len(), 4);
        assert!(hists[1].is_empty());
    }
}
