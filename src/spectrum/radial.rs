//! Azimuthal averaging of a centred 2D field into a 1D radial profile.
use log::debug;
use serde::{Deserialize, Serialize};

use super::fft::shifted_fftfreq;
use crate::error::{Result, StatError};
use crate::field::Map2;

/// Binning policy for [`radial_profile`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningOptions {
    /// Number of bins. `None` derives `round(max_pixel_distance / binsize) + 1`.
    pub nbins: Option<usize>,
    /// Bin size in pixel-distance units used by the automatic bin count.
    pub binsize: f64,
    /// Logarithmically spaced edges instead of linear ones.
    pub logspacing: bool,
    /// Lower edge of the first bin. Defaults to `1 / min(shape)` in frequency
    /// mode and 0.5 in pixel mode.
    pub min_bin: Option<f64>,
    /// Upper edge of the last bin. Defaults to 0.5 in frequency mode and the
    /// maximum pixel distance otherwise.
    pub max_bin: Option<f64>,
    /// Bin on spatial frequency (cycles/pixel) instead of pixel distance.
    pub use_frequencies: bool,
    /// Also return the per-bin standard deviation.
    pub return_stddev: bool,
}

impl Default for BinningOptions {
    fn default() -> Self {
        Self {
            nbins: None,
            binsize: 1.0,
            logspacing: false,
            min_bin: None,
            max_bin: None,
            use_frequencies: true,
            return_stddev: true,
        }
    }
}

impl BinningOptions {
    pub fn with_nbins(mut self, nbins: usize) -> Self {
        self.nbins = Some(nbins);
        self
    }

    pub fn with_logspacing(mut self, logspacing: bool) -> Self {
        self.logspacing = logspacing;
        self
    }

    pub fn with_bounds(mut self, min_bin: Option<f64>, max_bin: Option<f64>) -> Self {
        self.min_bin = min_bin;
        self.max_bin = max_bin;
        self
    }

    pub fn pixel_distances(mut self) -> Self {
        self.use_frequencies = false;
        self
    }
}

/// 1D profile with strictly increasing bin centres.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadialProfile {
    pub bin_centers: Vec<f64>,
    #[serde(deserialize_with = "crate::field::io::nan_as_null::vec")]
    pub values: Vec<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::field::io::nan_as_null::opt_vec"
    )]
    pub stddev: Option<Vec<f64>>,
}

impl RadialProfile {
    pub fn len(&self) -> usize {
        self.bin_centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bin_centers.is_empty()
    }
}

/// Pixel distance of every pixel from the map centre `(h / 2, w / 2)`.
pub fn pixel_distances(w: usize, h: usize) -> Map2 {
    let (cx, cy) = ((w / 2) as f64, (h / 2) as f64);
    Map2::from_fn(w, h, |x, y| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        (dx * dx + dy * dy).sqrt()
    })
}

/// Radial spatial frequency of every pixel of a centred spectrum.
///
/// The zero-frequency pixel is assigned half the smallest non-zero frequency
/// so it lands in a meaningful innermost bin and survives a log transform.
pub fn frequency_distances(w: usize, h: usize) -> Map2 {
    let fy = shifted_fftfreq(h);
    let fx = shifted_fftfreq(w);
    let mut dists = Map2::from_fn(w, h, |x, y| (fx[x] * fx[x] + fy[y] * fy[y]).sqrt());
    let min_nonzero = dists
        .data
        .iter()
        .copied()
        .filter(|&d| d > 0.0)
        .fold(f64::INFINITY, f64::min);
    if min_nonzero.is_finite() {
        for d in dists.data.iter_mut() {
            if *d == 0.0 {
                *d = 0.5 * min_nonzero;
            }
        }
    }
    dists
}

/// Bin edges between `lo` and `hi` (inclusive), `nbins + 1` values.
pub fn bin_edges(lo: f64, hi: f64, nbins: usize, logspacing: bool) -> Vec<f64> {
    let n = nbins as f64;
    if logspacing {
        let (llo, lhi) = (lo.log10(), hi.log10());
        (0..=nbins)
            .map(|i| 10f64.powf(llo + (lhi - llo) * i as f64 / n))
            .collect()
    } else {
        (0..=nbins)
            .map(|i| lo + (hi - lo) * i as f64 / n)
            .collect()
    }
}

/// Reduce a centred 2D field to its radial profile.
///
/// Bins are half-open `[lo, hi)` except the last, which includes its upper
/// edge. Points outside the edges are ignored, as are NaN values. A bin
/// without finite values reports NaN.
pub fn radial_profile(field: &Map2, opts: &BinningOptions) -> Result<RadialProfile> {
    let (w, h) = (field.w, field.h);
    let dists = pixel_distances(w, h);
    let max_dist = dists.data.iter().copied().fold(0.0, f64::max);
    if max_dist <= 0.0 {
        return Err(StatError::DegenerateField);
    }
    if !(opts.binsize > 0.0) {
        return Err(StatError::invalid("binsize", "must be positive"));
    }

    let nbins = opts
        .nbins
        .unwrap_or_else(|| (max_dist / opts.binsize).round() as usize + 1);
    if nbins == 0 {
        return Err(StatError::invalid("nbins", "must be at least 1"));
    }

    let (dist_arr, default_min, default_max) = if opts.use_frequencies {
        (frequency_distances(w, h), 1.0 / w.min(h) as f64, 0.5)
    } else {
        (dists, 0.5, max_dist)
    };
    let min_bin = opts.min_bin.unwrap_or(default_min);
    let max_bin = opts.max_bin.unwrap_or(default_max);
    if !(max_bin > min_bin) {
        return Err(StatError::invalid(
            "max_bin",
            format!("must exceed min_bin ({min_bin} >= {max_bin})"),
        ));
    }
    if opts.logspacing && min_bin <= 0.0 {
        return Err(StatError::invalid("min_bin", "must be positive for log spacing"));
    }

    let edges = bin_edges(min_bin, max_bin, nbins, opts.logspacing);
    let mut accum = vec![BinAccumulator::default(); nbins];
    for (&d, &v) in dist_arr.data.iter().zip(field.data.iter()) {
        if let Some(bin) = locate_bin(&edges, d) {
            accum[bin].push(v);
        }
    }

    let bin_centers: Vec<f64> = edges.windows(2).map(|e| 0.5 * (e[0] + e[1])).collect();
    let values = accum.iter().map(BinAccumulator::mean).collect();
    let stddev = opts
        .return_stddev
        .then(|| accum.iter().map(BinAccumulator::std).collect());

    debug!(
        "radial_profile: {}x{} field -> {} bins in [{:.4}, {:.4}] (log={})",
        w, h, nbins, min_bin, max_bin, opts.logspacing
    );

    Ok(RadialProfile {
        bin_centers,
        values,
        stddev,
    })
}

fn locate_bin(edges: &[f64], d: f64) -> Option<usize> {
    let nbins = edges.len() - 1;
    let (lo, hi) = (edges[0], edges[nbins]);
    if !(d >= lo && d <= hi) {
        return None;
    }
    if d == hi {
        return Some(nbins - 1);
    }
    // First edge strictly greater than d, minus one.
    let upper = edges.partition_point(|&e| e <= d);
    Some(upper.saturating_sub(1).min(nbins - 1))
}

#[derive(Clone, Copy, Default)]
struct BinAccumulator {
    n: usize,
    sum: f64,
    sum_sq: f64,
}

impl BinAccumulator {
    fn push(&mut self, v: f64) {
        if v.is_nan() {
            return;
        }
        self.n += 1;
        self.sum += v;
        self.sum_sq += v * v;
    }

    fn mean(&self) -> f64 {
        if self.n == 0 {
            f64::NAN
        } else {
            self.sum / self.n as f64
        }
    }

    /// Population standard deviation.
    fn std(&self) -> f64 {
        if self.n == 0 {
            return f64::NAN;
        }
        let mean = self.mean();
        (self.sum_sq / self.n as f64 - mean * mean).max(0.0).sqrt()
    }
}
