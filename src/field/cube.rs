//! Owned spectral-line cube stored spectral axis first: `(channel, y, x)`.
use serde::{Deserialize, Serialize};

use super::map::Map2;
use crate::error::{Result, StatError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    pub nchan: usize,
    pub h: usize,
    pub w: usize,
    #[serde(deserialize_with = "crate::field::io::nan_as_null::vec")]
    pub data: Vec<f64>,
}

impl Cube {
    pub fn new(nchan: usize, h: usize, w: usize) -> Self {
        Self {
            nchan,
            h,
            w,
            data: vec![0.0; nchan * h * w],
        }
    }

    pub fn from_vec(nchan: usize, h: usize, w: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != nchan * h * w {
            return Err(StatError::ShapeMismatch {
                expected: vec![nchan, h, w],
                found: vec![data.len()],
            });
        }
        Ok(Self { nchan, h, w, data })
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.nchan, self.h, self.w]
    }

    #[inline]
    pub fn idx(&self, c: usize, x: usize, y: usize) -> usize {
        (c * self.h + y) * self.w + x
    }

    #[inline]
    pub fn get(&self, c: usize, x: usize, y: usize) -> f64 {
        self.data[self.idx(c, x, y)]
    }

    #[inline]
    pub fn set(&mut self, c: usize, x: usize, y: usize, v: f64) {
        let i = self.idx(c, x, y);
        self.data[i] = v;
    }

    pub fn channel_slice(&self, c: usize) -> &[f64] {
        let plane = self.h * self.w;
        &self.data[c * plane..(c + 1) * plane]
    }

    /// Copy one spectral channel out as a map.
    pub fn channel(&self, c: usize) -> Map2 {
        Map2 {
            w: self.w,
            h: self.h,
            data: self.channel_slice(c).to_vec(),
        }
    }

    /// Average groups of `factor` adjacent channels.
    ///
    /// A trailing group shorter than `factor` is dropped. NaNs propagate into
    /// the averaged channel.
    pub fn rebin_spectral(&self, factor: usize) -> Result<Cube> {
        if factor == 0 {
            return Err(StatError::invalid("factor", "must be at least 1"));
        }
        let nchan = self.nchan / factor;
        if nchan == 0 {
            return Err(StatError::InsufficientData {
                context: "spectral rebinning",
                needed: factor,
                found: self.nchan,
            });
        }
        let plane = self.h * self.w;
        let mut out = Cube::new(nchan, self.h, self.w);
        let scale = 1.0 / factor as f64;
        for c in 0..nchan {
            let dst = &mut out.data[c * plane..(c + 1) * plane];
            for k in 0..factor {
                let src = self.channel_slice(c * factor + k);
                for (d, s) in dst.iter_mut().zip(src) {
                    *d += s * scale;
                }
            }
        }
        Ok(out)
    }

    /// Sum along the spectral axis (NaNs skipped).
    pub fn integrate_spectral(&self) -> Map2 {
        let mut out = Map2::new(self.w, self.h);
        for c in 0..self.nchan {
            for (d, s) in out.data.iter_mut().zip(self.channel_slice(c)) {
                if s.is_finite() {
                    *d += s;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebin_halves_channel_count() {
        let mut cube = Cube::new(5, 1, 2);
        for c in 0..5 {
            cube.set(c, 0, 0, c as f64);
            cube.set(c, 1, 0, 1.0);
        }
        let binned = cube.rebin_spectral(2).unwrap();
        assert_eq!(binned.nchan, 2);
        assert_eq!(binned.get(0, 0, 0), 0.5);
        assert_eq!(binned.get(1, 0, 0), 2.5);
        assert_eq!(binned.get(1, 1, 0), 1.0);
    }

    #[test]
    fn rebin_rejects_zero_factor() {
        let cube = Cube::new(4, 2, 2);
        assert!(cube.rebin_spectral(0).is_err());
    }
}
