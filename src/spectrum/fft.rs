//! 2D FFT helpers built on `rustfft`, following numpy's conventions for
//! frequency grids and centring.
use rustfft::{num_complex::Complex, FftPlanner};

use crate::field::{FieldView, Map2};

/// Forward 2D FFT of a real map. Output is row-major, unshifted.
pub fn fft2(map: &Map2) -> Vec<Complex<f64>> {
    let (w, h) = (map.w, map.h);
    let mut data: Vec<Complex<f64>> = map
        .rows()
        .flat_map(|row| row.iter().map(|&v| Complex::new(v, 0.0)))
        .collect();
    if w == 0 || h == 0 {
        return data;
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    for row in data.chunks_exact_mut(w) {
        fft_row.process(row);
    }

    let mut col = vec![Complex::new(0.0, 0.0); h];
    for x in 0..w {
        for y in 0..h {
            col[y] = data[y * w + x];
        }
        fft_col.process(&mut col);
        for y in 0..h {
            data[y * w + x] = col[y];
        }
    }
    data
}

/// Move the zero-frequency term to index `(h / 2, w / 2)`.
pub fn fftshift<T: Copy + Default>(data: &[T], w: usize, h: usize) -> Vec<T> {
    let mut shifted = vec![T::default(); data.len()];
    let (hw, hh) = (w / 2, h / 2);
    for y in 0..h {
        let sy = (y + hh) % h;
        for x in 0..w {
            let sx = (x + hw) % w;
            shifted[sy * w + sx] = data[y * w + x];
        }
    }
    shifted
}

/// Sample frequencies (cycles per pixel) of an `n`-point FFT, unshifted.
pub fn fftfreq(n: usize) -> Vec<f64> {
    let nf = n as f64;
    let positive = n.div_ceil(2);
    (0..n)
        .map(|i| {
            if i < positive {
                i as f64 / nf
            } else {
                (i as f64 - nf) / nf
            }
        })
        .collect()
}

/// Frequencies in centred order, matching [`fftshift`].
pub fn shifted_fftfreq(n: usize) -> Vec<f64> {
    let half = (n / 2) as f64;
    (0..n).map(|i| (i as f64 - half) / n as f64).collect()
}

/// Centred `(fy, fx)` frequency grids for a `w × h` spectrum.
pub fn frequency_grid(w: usize, h: usize) -> (Map2, Map2) {
    let fy = shifted_fftfreq(h);
    let fx = shifted_fftfreq(w);
    (
        Map2::from_fn(w, h, |_, y| fy[y]),
        Map2::from_fn(w, h, |x, _| fx[x]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fftfreq_matches_numpy_layout() {
        assert_eq!(fftfreq(4), vec![0.0, 0.25, -0.5, -0.25]);
        assert_eq!(fftfreq(5), vec![0.0, 0.2, 0.4, -0.4, -0.2]);
    }

    #[test]
    fn shifted_frequencies_equal_shifted_fftfreq() {
        for n in [4usize, 5, 8, 9] {
            let f = fftfreq(n);
            let shifted = fftshift(&f, n, 1);
            let direct = shifted_fftfreq(n);
            for (a, b) in shifted.iter().zip(direct.iter()) {
                assert!((a - b).abs() < 1e-12, "n={n}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn constant_map_has_power_only_at_dc() {
        let map = Map2::from_fn(4, 4, |_, _| 2.0);
        let transform = fft2(&map);
        assert!((transform[0].re - 32.0).abs() < 1e-9);
        let rest: f64 = transform[1..].iter().map(|c| c.norm_sqr()).sum();
        assert!(rest < 1e-18);
    }

    #[test]
    fn parseval_holds() {
        let map = Map2::from_fn(6, 5, |x, y| ((x * 7 + y * 3) % 5) as f64 - 1.5);
        let transform = fft2(&map);
        let spatial: f64 = map.data.iter().map(|v| v * v).sum();
        let spectral: f64 = transform.iter().map(|c| c.norm_sqr()).sum::<f64>() / 30.0;
        assert!((spatial - spectral).abs() < 1e-9);
    }
}
