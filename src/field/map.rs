//! Owned single-channel f64 map in row-major layout.
//!
//! Used for 2D inputs (integrated intensity, centroid and linewidth maps) and
//! for derived 2D products such as centred power spectra. NaN marks missing
//! data.
use serde::{Deserialize, Serialize};

use super::traits::FieldView;
use crate::error::{Result, StatError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Map2 {
    /// Map width in pixels (x axis)
    pub w: usize,
    /// Map height in pixels (y axis)
    pub h: usize,
    /// Backing storage in row-major order
    #[serde(deserialize_with = "crate::field::io::nan_as_null::vec")]
    pub data: Vec<f64>,
}

impl Map2 {
    /// Construct a zero-initialized map of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0.0; w * h],
        }
    }

    /// Wrap an existing buffer, checking that it holds exactly `w × h` values.
    pub fn from_vec(w: usize, h: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != w * h {
            return Err(StatError::ShapeMismatch {
                expected: vec![h, w],
                found: vec![data.len()],
            });
        }
        Ok(Self { w, h, data })
    }

    /// Build a map by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self { w, h, data }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f64) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Minimum over finite values, or `None` when the map has none.
    pub fn finite_min(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
    }

    /// Mean over finite values (NaN when there are none).
    pub fn finite_mean(&self) -> f64 {
        let (sum, n) = self
            .data
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if n == 0 {
            f64::NAN
        } else {
            sum / n as f64
        }
    }

    pub fn has_non_finite(&self) -> bool {
        self.data.iter().any(|v| !v.is_finite())
    }

    /// Replace NaNs with the minimum finite value of the map.
    ///
    /// This is the cleaning step required before a power spectrum is taken.
    /// A map without any finite value is left untouched.
    pub fn fill_nans_with_min(&mut self) {
        if let Some(min) = self.finite_min() {
            for v in self.data.iter_mut() {
                if v.is_nan() {
                    *v = min;
                }
            }
        }
    }

    /// Element-wise combination of two maps of equal shape.
    pub fn zip_map(&self, other: &Map2, f: impl Fn(f64, f64) -> f64) -> Result<Map2> {
        ensure_same_shape(self, other)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Map2 {
            w: self.w,
            h: self.h,
            data,
        })
    }
}

pub(crate) fn ensure_same_shape(a: &Map2, b: &Map2) -> Result<()> {
    if a.w != b.w || a.h != b.h {
        return Err(StatError::ShapeMismatch {
            expected: vec![a.h, a.w],
            found: vec![b.h, b.w],
        });
    }
    Ok(())
}

impl FieldView for Map2 {
    type Value = f64;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn row(&self, y: usize) -> &[f64] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}
