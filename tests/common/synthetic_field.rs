use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use turbulence_stats::field::{Cube, Map2};
use turbulence_stats::fit::log_elliptical_powerlaw;
use turbulence_stats::spectrum::fft::fftfreq;

/// Real `n`x`n` field whose power spectrum is exactly `|k|^index` (up to a
/// constant), with random phases.
pub fn power_law_map(n: usize, index: f64, seed: u64) -> Map2 {
    spectral_map(n, seed, |kx, ky| {
        let k = (kx * kx + ky * ky).sqrt();
        k.powf(index)
    })
}

/// Continuous broken power law: `|k|^below` up to `brk`, `|k|^above` past it.
pub fn broken_power_law_map(n: usize, below: f64, above: f64, brk: f64, seed: u64) -> Map2 {
    spectral_map(n, seed, |kx, ky| {
        let k = (kx * kx + ky * ky).sqrt();
        if k <= brk {
            k.powf(below)
        } else {
            brk.powf(below - above) * k.powf(above)
        }
    })
}

/// Real field whose 2D power spectrum follows the log-space elliptical
/// power law with `params = [logamplitude, ellip_transf, theta, gamma]`.
pub fn elliptical_power_law_map(n: usize, params: [f64; 4], seed: u64) -> Map2 {
    spectral_map(n, seed, |kx, ky| {
        10f64.powf(log_elliptical_powerlaw(kx, ky, &params))
    })
}

/// Build a Hermitian spectrum with amplitude `sqrt(power(kx, ky))` and
/// random phases, then inverse transform it. The DC term is zero.
fn spectral_map(n: usize, seed: u64, power: impl Fn(f64, f64) -> f64) -> Map2 {
    assert!(n > 1, "field size must exceed one pixel");
    let mut rng = StdRng::seed_from_u64(seed);
    let freqs = fftfreq(n);
    let mut spectrum = vec![Complex::new(0.0, 0.0); n * n];
    for y in 0..n {
        for x in 0..n {
            let (px, py) = ((n - x) % n, (n - y) % n);
            let idx = y * n + x;
            let partner = py * n + px;
            if partner < idx || (x == 0 && y == 0) {
                continue;
            }
            let amp = power(freqs[x], freqs[y]).sqrt();
            if partner == idx {
                let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                spectrum[idx] = Complex::new(sign * amp, 0.0);
            } else {
                let phase = rng.gen_range(0.0..std::f64::consts::TAU);
                let value = Complex::from_polar(amp, phase);
                spectrum[idx] = value;
                spectrum[partner] = value.conj();
            }
        }
    }
    inverse_fft2(&mut spectrum, n);
    Map2::from_vec(n, n, spectrum.iter().map(|c| c.re / (n * n) as f64).collect())
        .expect("square buffer")
}

fn inverse_fft2(data: &mut [Complex<f64>], n: usize) {
    let mut planner = FftPlanner::<f64>::new();
    let ifft = planner.plan_fft_inverse(n);
    for row in data.chunks_exact_mut(n) {
        ifft.process(row);
    }
    let mut col = vec![Complex::new(0.0, 0.0); n];
    for x in 0..n {
        for y in 0..n {
            col[y] = data[y * n + x];
        }
        ifft.process(&mut col);
        for y in 0..n {
            data[y * n + x] = col[y];
        }
    }
}

/// Rescale a map linearly onto `[0, 1]`.
pub fn normalized(map: &Map2) -> Map2 {
    let lo = map.data.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = map.data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = (hi - lo).max(f64::MIN_POSITIVE);
    Map2::from_vec(map.w, map.h, map.data.iter().map(|v| (v - lo) / span).collect())
        .expect("same shape")
}

/// Cube `map(x, y) · exp(−½((c − centre) / width)²)`.
pub fn separable_cube(map: &Map2, nchan: usize, centre: f64, width: f64) -> Cube {
    let mut cube = Cube::new(nchan, map.h, map.w);
    for c in 0..nchan {
        let g = (-0.5 * ((c as f64 - centre) / width).powi(2)).exp();
        for y in 0..map.h {
            for x in 0..map.w {
                cube.set(c, x, y, map.get(x, y) * g);
            }
        }
    }
    cube
}

/// Isolated Gaussian bumps of width `sigma` on a zero background, one per
/// entry of `heights`, centred on a regular grid with `spacing` pixels.
pub fn bump_field(heights: &[f64], spacing: usize, sigma: f64) -> Map2 {
    let per_row = (heights.len() as f64).sqrt().ceil() as usize;
    let n = per_row * spacing;
    let mut map = Map2::new(n, n);
    for (i, &h) in heights.iter().enumerate() {
        let cx = (i % per_row) * spacing + spacing / 2;
        let cy = (i / per_row) * spacing + spacing / 2;
        for y in 0..n {
            for x in 0..n {
                let dx = x as f64 - cx as f64;
                let dy = y as f64 - cy as f64;
                let v = h * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
                if v > map.get(x, y) {
                    map.set(x, y, v);
                }
            }
        }
    }
    map
}

/// `log10(amp · x^slope)` plus Gaussian noise of standard deviation `sigma`.
pub fn noisy_log_power_law(xs: &[f64], amp: f64, slope: f64, sigma: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    xs.iter()
        .map(|&x| amp.log10() + slope * x.log10() + sigma * gaussian(&mut rng))
        .collect()
}

fn gaussian(rng: &mut StdRng) -> f64 {
    // Box-Muller
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
