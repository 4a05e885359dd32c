use log::warn;

use crate::error::{Result, StatError};
use crate::fit::stats::std_dev;

/// Position of the largest moving-window standard deviation in `y`.
///
/// Windows hold `size` points centred on each interior index. The first
/// maximum wins. A sequence shorter than the window yields 0.
pub fn std_window(y: &[f64], size: usize) -> Result<usize> {
    let (pos, _) = std_window_profile(y, size)?;
    Ok(pos)
}

/// Like [`std_window`], also returning the per-window deviations.
pub fn std_window_profile(y: &[f64], size: usize) -> Result<(usize, Vec<f64>)> {
    if size == 0 || size % 2 == 0 {
        return Err(StatError::invalid("size", "window size must be a positive odd number"));
    }
    if y.len() < size {
        warn!(
            "std_window: {} points is fewer than the window size {size}; using position 0",
            y.len()
        );
        return Ok((0, Vec::new()));
    }
    let half = (size - 1) / 2;
    let stds: Vec<f64> = y.windows(size).map(|w| std_dev(w, 0)).collect();
    let mut best = 0;
    for (i, &s) in stds.iter().enumerate() {
        if s > stds[best] {
            best = i;
        }
    }
    Ok((best + half, stds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spike_in_variability_marks_the_break() {
        // flat, then a sharp drop into a slow tail
        let y = [100.0, 100.0, 100.0, 99.0, 98.0, 60.0, 20.0, 18.0, 16.0, 14.0, 12.0];
        let pos = std_window(&y, 3).unwrap();
        assert_eq!(pos, 5);
    }

    #[test]
    fn first_maximum_wins_on_ties() {
        let y = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let (pos, stds) = std_window_profile(&y, 3).unwrap();
        assert_eq!(stds.len(), 6);
        let max = stds.iter().copied().fold(f64::MIN, f64::max);
        let first = stds.iter().position(|&s| s == max).unwrap();
        assert_eq!(pos, first + 1);
        assert!(pos < 4);
    }

    #[test]
    fn short_sequences_fall_back_to_zero() {
        assert_eq!(std_window(&[3.0, 2.0], 5).unwrap(), 0);
        assert!(std_window(&[1.0; 10], 4).is_err());
    }
}
