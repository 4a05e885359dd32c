//! Histograms of structure peak values and the distances built on them.
use serde::{Deserialize, Serialize};

use crate::fit::stats::{mean, nansum, std_dev};

/// Counts (or densities) over contiguous bins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub bin_centers: Vec<f64>,
    pub counts: Vec<f64>,
}

impl Histogram {
    /// Empty placeholder recorded when a level has too few values.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// `nbins + 1` evenly spaced edges over the finite range of `values`.
///
/// A degenerate range is widened to `±0.5` around its value.
pub fn histogram_edges(values: &[f64], nbins: usize) -> Vec<f64> {
    let (lo, hi) = finite_range(values).unwrap_or((0.0, 1.0));
    linspace_edges(lo, hi, nbins)
}

fn linspace_edges(mut lo: f64, mut hi: f64, nbins: usize) -> Vec<f64> {
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let n = nbins.max(1);
    (0..=n)
        .map(|i| lo + (hi - lo) * i as f64 / n as f64)
        .collect()
}

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Bin `values` on `edges`: half-open bins, the last one closed. Values
/// outside the edges and non-finite values are ignored.
///
/// With `density` the result integrates to one over the bins.
pub fn histogram_on_edges(values: &[f64], edges: &[f64], density: bool) -> Vec<f64> {
    let nbins = edges.len().saturating_sub(1);
    let mut counts = vec![0.0; nbins];
    if nbins == 0 {
        return counts;
    }
    let (lo, hi) = (edges[0], edges[nbins]);
    for &v in values {
        if !(v >= lo && v <= hi) {
            continue;
        }
        let bin = if v == hi {
            nbins - 1
        } else {
            edges.partition_point(|&e| e <= v).saturating_sub(1).min(nbins - 1)
        };
        counts[bin] += 1.0;
    }
    if density {
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for (c, w) in counts.iter_mut().zip(edges.windows(2)) {
                *c /= total * (w[1] - w[0]);
            }
        }
    }
    counts
}

/// Histogram with `nbins` bins over the range of `values`.
pub fn histogram(values: &[f64], nbins: usize) -> Histogram {
    let edges = histogram_edges(values, nbins);
    let counts = histogram_on_edges(values, &edges, false);
    Histogram {
        bin_centers: edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect(),
        counts,
    }
}

/// Zero mean, unit (population) variance. A constant sample is only
/// centred.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let s = std_dev(values, 0);
    if s > 0.0 && s.is_finite() {
        values.iter().map(|v| (v - m) / s).collect()
    } else {
        values.iter().map(|v| v - m).collect()
    }
}

/// Shared edges over the combined range of two samples, `nbins + 1` values.
pub fn common_histogram_bins(a: &[f64], b: &[f64], nbins: usize) -> Vec<f64> {
    let range = match (finite_range(a), finite_range(b)) {
        (Some((alo, ahi)), Some((blo, bhi))) => Some((alo.min(blo), ahi.max(bhi))),
        (r, None) | (None, r) => r,
    };
    let (lo, hi) = range.unwrap_or((0.0, 1.0));
    linspace_edges(lo, hi, nbins)
}

/// `sqrt(Σ(√p − √q)²) / √2`, ignoring NaN entries.
pub fn hellinger(p: &[f64], q: &[f64]) -> f64 {
    let diffs: Vec<f64> = p
        .iter()
        .zip(q.iter())
        .map(|(a, b)| (a.sqrt() - b.sqrt()).powi(2))
        .collect();
    nansum(&diffs).sqrt() / std::f64::consts::SQRT_2
}

/// Cumulative sums along a histogram; NaN padding stays NaN.
pub fn ecdf(hist: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    hist.iter()
        .map(|&h| {
            if h.is_nan() {
                f64::NAN
            } else {
                acc += h;
                acc
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_bin_includes_its_upper_edge() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(h.counts, vec![1.0, 1.0, 1.0, 2.0]);
        assert_eq!(h.bin_centers, vec![0.5, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn density_integrates_to_one() {
        let edges = [0.0, 0.5, 2.0];
        let d = histogram_on_edges(&[0.1, 0.2, 1.0, 1.5], &edges, true);
        let integral: f64 = d.iter().zip(edges.windows(2)).map(|(h, w)| h * (w[1] - w[0])).sum();
        assert!((integral - 1.0).abs() < 1e-12);
    }

    #[test]
    fn standardized_sample_has_unit_spread() {
        let z = standardize(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        assert!(mean(&z).abs() < 1e-12);
        assert!((std_dev(&z, 0) - 1.0).abs() < 1e-12);
        assert_eq!(standardize(&[2.0, 2.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn hellinger_bounds() {
        let p = [0.5, 0.5, f64::NAN];
        assert_eq!(hellinger(&p, &p), 0.0);
        let d = hellinger(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn common_bins_span_both_samples() {
        let edges = common_histogram_bins(&[-1.0, 0.0], &[0.5, 3.0], 4);
        assert_eq!(edges.len(), 5);
        assert_eq!(edges[0], -1.0);
        assert_eq!(edges[4], 3.0);
    }

    #[test]
    fn ecdf_keeps_padding() {
        let e = ecdf(&[0.25, 0.25, 0.5, f64::NAN]);
        assert_eq!(&e[..3], &[0.25, 0.5, 1.0]);
        assert!(e[3].is_nan());
    }
}
