//! 2D power spectra of single maps, modified centroid triples and cubes.
use log::debug;
use rustfft::num_complex::Complex;

use super::fft::{fft2, fftshift};
use crate::error::{Result, StatError};
use crate::field::map::ensure_same_shape;
use crate::field::{Cube, Map2};

/// Centred `|FFT(map)|²`.
///
/// NaNs must be cleaned by the caller beforehand (see
/// [`Map2::fill_nans_with_min`]); a non-finite input is rejected.
pub fn power_spectrum_2d(map: &Map2) -> Result<Map2> {
    if map.has_non_finite() {
        return Err(StatError::NonFiniteInput {
            context: "power spectrum input",
        });
    }
    Ok(centred_power(&fft2(map), map.w, map.h))
}

/// Modified spectrum of a centroid map `c`, zeroth moment `m0` and line
/// width `lw`:
///
/// `|FFT(c·m0) − mean(lw² + c²)·FFT(m0)|²`, centred.
///
/// The mean ignores NaNs; all three maps must share a shape.
pub fn modified_power_spectrum(centroid: &Map2, moment0: &Map2, linewidth: &Map2) -> Result<Map2> {
    ensure_same_shape(centroid, moment0)?;
    ensure_same_shape(centroid, linewidth)?;
    if centroid.has_non_finite() || moment0.has_non_finite() {
        return Err(StatError::NonFiniteInput {
            context: "modified power spectrum input",
        });
    }

    let second_moment = linewidth.zip_map(centroid, |lw, c| lw * lw + c * c)?;
    let term = second_moment.finite_mean();
    if !term.is_finite() {
        return Err(StatError::NonFiniteInput {
            context: "line width / centroid second moment",
        });
    }

    let weighted = centroid.zip_map(moment0, |c, m| c * m)?;
    let fft_weighted = fft2(&weighted);
    let fft_m0 = fft2(moment0);
    let diff: Vec<Complex<f64>> = fft_weighted
        .iter()
        .zip(fft_m0.iter())
        .map(|(a, b)| a - b * term)
        .collect();

    debug!(
        "modified_power_spectrum: {}x{} maps, <lw^2 + c^2> = {:.4e}",
        centroid.w, centroid.h, term
    );
    Ok(centred_power(&diff, centroid.w, centroid.h))
}

/// Sum over channels of each channel's centred `|FFT|²`.
pub fn channel_power_spectrum(cube: &Cube) -> Result<Map2> {
    if cube.nchan == 0 {
        return Err(StatError::InsufficientData {
            context: "channel power spectrum",
            needed: 1,
            found: 0,
        });
    }
    let (w, h) = (cube.w, cube.h);
    let mut total = Map2::new(w, h);
    for c in 0..cube.nchan {
        let mut channel = cube.channel(c);
        channel.fill_nans_with_min();
        if channel.has_non_finite() {
            return Err(StatError::NonFiniteInput {
                context: "cube channel",
            });
        }
        let ps = centred_power(&fft2(&channel), w, h);
        for (acc, v) in total.data.iter_mut().zip(ps.data.iter()) {
            *acc += v;
        }
    }
    debug!("channel_power_spectrum: summed {} channels of {}x{}", cube.nchan, w, h);
    Ok(total)
}

fn centred_power(spectrum: &[Complex<f64>], w: usize, h: usize) -> Map2 {
    let power: Vec<f64> = spectrum.iter().map(|z| z.norm_sqr()).collect();
    Map2 {
        w,
        h,
        data: fftshift(&power, w, h),
    }
}
