//! Binning and fitting shared by every power-spectrum statistic.
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::fft::frequency_grid;
use super::radial::{radial_profile, BinningOptions, RadialProfile};
use super::units::Frequency;
use crate::error::{Result, StatError};
use crate::field::{FieldHeader, Map2};
use crate::fit::{
    fit_elliptical_powerlaw, fit_power_law, interval_transform, EllipticalFitOptions, FitResult,
    PowerLawFitOptions,
};

/// Default upper fit limit in cycles per pixel (Nyquist).
pub const DEFAULT_HIGH_CUT: f64 = 0.5;

/// 1D fit options with cuts expressed in `unit`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumFitOptions {
    #[serde(flatten)]
    pub power_law: PowerLawFitOptions,
    pub unit: Frequency,
}

impl SpectrumFitOptions {
    pub fn with_cuts(mut self, low_cut: Option<f64>, high_cut: Option<f64>) -> Self {
        self.power_law = self.power_law.with_cuts(low_cut, high_cut);
        self
    }

    pub fn with_break(mut self, brk: f64) -> Self {
        self.power_law = self.power_law.with_break(brk);
        self
    }

    pub fn with_unit(mut self, unit: Frequency) -> Self {
        self.unit = unit;
        self
    }
}

/// Options for the elliptical fit of the full 2D spectrum.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Spectrum2dFitOptions {
    pub low_cut: Option<f64>,
    pub high_cut: Option<f64>,
    pub unit: Frequency,
    /// Initial ellipticity in `(0, 1)`.
    pub ellip0: f64,
    /// Initial position angle in radians.
    pub theta0: f64,
    #[serde(flatten)]
    pub fit: EllipticalFitOptions,
}

impl Default for Spectrum2dFitOptions {
    fn default() -> Self {
        Self {
            low_cut: None,
            high_cut: None,
            unit: Frequency::PerPixel,
            ellip0: 0.5,
            theta0: 0.0,
            fit: EllipticalFitOptions::default(),
        }
    }
}

/// Everything [`SpectrumAnalysis::run`] does in one pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumRunOptions {
    pub binning: BinningOptions,
    pub fit: SpectrumFitOptions,
    pub fit_2d: bool,
    pub fit_2d_options: Spectrum2dFitOptions,
}

impl Default for SpectrumRunOptions {
    fn default() -> Self {
        Self {
            binning: BinningOptions::default(),
            fit: SpectrumFitOptions::default(),
            fit_2d: true,
            fit_2d_options: Spectrum2dFitOptions::default(),
        }
    }
}

/// Derived results of a power-spectrum statistic.
#[derive(Clone, Debug)]
pub struct SpectrumAnalysis {
    header: FieldHeader,
    ps2d: Option<Map2>,
    profile: Option<RadialProfile>,
    fit: Option<FitResult>,
    fit_2d: Option<FitResult>,
}

impl SpectrumAnalysis {
    pub(crate) fn new(header: FieldHeader) -> Self {
        Self {
            header,
            ps2d: None,
            profile: None,
            fit: None,
            fit_2d: None,
        }
    }

    /// Install a freshly computed 2D spectrum and drop results derived from
    /// a previous one.
    pub(crate) fn set_ps2d(&mut self, ps2d: Map2) {
        self.ps2d = Some(ps2d);
        self.profile = None;
        self.fit = None;
        self.fit_2d = None;
    }

    pub fn header(&self) -> &FieldHeader {
        &self.header
    }

    pub fn ps2d(&self) -> Result<&Map2> {
        self.ps2d.as_ref().ok_or(StatError::NotComputed {
            what: "2D power spectrum",
        })
    }

    pub fn profile(&self) -> Result<&RadialProfile> {
        self.profile.as_ref().ok_or(StatError::NotComputed {
            what: "radial power spectrum",
        })
    }

    pub fn fit(&self) -> Result<&FitResult> {
        self.fit.as_ref().ok_or(StatError::NotComputed {
            what: "power-law fit",
        })
    }

    pub fn fit_2d(&self) -> Result<&FitResult> {
        self.fit_2d.as_ref().ok_or(StatError::NotComputed {
            what: "2D elliptical fit",
        })
    }

    /// Slope of the 1D fit, NaN before fitting.
    pub fn slope(&self) -> f64 {
        self.fit.as_ref().map_or(f64::NAN, FitResult::slope)
    }

    pub fn slope_err(&self) -> f64 {
        self.fit.as_ref().map_or(f64::NAN, FitResult::slope_err)
    }

    /// Azimuthally average the 2D spectrum on spatial-frequency bins.
    pub fn compute_radial_pspec(&mut self, opts: &BinningOptions) -> Result<&RadialProfile> {
        if !opts.use_frequencies {
            return Err(StatError::invalid(
                "use_frequencies",
                "power spectra are binned in spatial frequency",
            ));
        }
        let profile = radial_profile(self.ps2d()?, opts)?;
        self.fit = None;
        self.fit_2d = None;
        Ok(self.profile.insert(profile))
    }

    /// Fit a (possibly broken) power law to the radial spectrum.
    ///
    /// A broken fit that cannot be carried out falls back to a single power
    /// law with a warning.
    pub fn fit_pspec(&mut self, opts: &SpectrumFitOptions) -> Result<&FitResult> {
        let profile = self.profile()?;
        let mut resolved = opts.power_law.clone();
        resolved.low_cut = self.to_per_pixel(opts.unit, opts.power_law.low_cut)?;
        resolved.high_cut = Some(
            self.to_per_pixel(opts.unit, opts.power_law.high_cut)?
                .unwrap_or(DEFAULT_HIGH_CUT),
        );
        resolved.brk = self.to_per_pixel(opts.unit, opts.power_law.brk)?;

        let stddev = profile.stddev.as_deref();
        let fit = match fit_power_law(&profile.bin_centers, &profile.values, stddev, &resolved) {
            Ok(fit) => fit,
            Err(err @ (StatError::InsufficientData { .. } | StatError::SingularFit { .. }))
                if resolved.brk.is_some() =>
            {
                warn!("broken power-law fit failed ({err}); fitting a single power law");
                resolved.brk = None;
                fit_power_law(&profile.bin_centers, &profile.values, stddev, &resolved)?
            }
            Err(err) => return Err(err),
        };
        debug!(
            "fit_pspec: slope={:.4} +/- {:.4} over {} bins",
            fit.slope(),
            fit.slope_err(),
            fit.nobs
        );
        Ok(self.fit.insert(fit))
    }

    /// Fit the elliptical power law to the 2D spectrum, starting from the 1D
    /// fit.
    pub fn fit_2dpspec(&mut self, opts: &Spectrum2dFitOptions) -> Result<&FitResult> {
        let fit_1d = self.fit()?;
        let p0 = [
            fit_1d.value("intercept"),
            interval_transform(opts.ellip0, 0.0, 1.0),
            opts.theta0,
            fit_1d.slope(),
        ];
        if !p0.iter().all(|v| v.is_finite()) {
            return Err(StatError::invalid(
                "ellip0",
                "initial ellipticity must lie strictly inside (0, 1)",
            ));
        }
        let low = self.to_per_pixel(opts.unit, opts.low_cut)?.unwrap_or(0.0);
        let high = self
            .to_per_pixel(opts.unit, opts.high_cut)?
            .unwrap_or(DEFAULT_HIGH_CUT);

        let ps2d = self.ps2d()?;
        let (fy, fx) = frequency_grid(ps2d.w, ps2d.h);
        let mut values = Vec::new();
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for ((&p, &x), &y) in ps2d.data.iter().zip(fx.data.iter()).zip(fy.data.iter()) {
            let f = (x * x + y * y).sqrt();
            if f == 0.0 || f < low || f > high || !(p > 0.0) || !p.is_finite() {
                continue;
            }
            values.push(p.log10());
            xs.push(x);
            ys.push(y);
        }
        let fit = fit_elliptical_powerlaw(&values, &xs, &ys, p0, &opts.fit)?;
        Ok(self.fit_2d.insert(fit))
    }

    fn to_per_pixel(&self, unit: Frequency, value: Option<f64>) -> Result<Option<f64>> {
        value.map(|v| unit.to_per_pixel(v, &self.header)).transpose()
    }
}

/// Statistics that produce a 2D power spectrum and delegate the rest to a
/// [`SpectrumAnalysis`].
pub trait SpectrumStatistic {
    fn analysis(&self) -> &SpectrumAnalysis;
    fn analysis_mut(&mut self) -> &mut SpectrumAnalysis;
    /// Compute the 2D spectrum from the owned field(s).
    fn compute_pspec(&mut self) -> Result<&Map2>;

    /// Spectrum, radial profile, 1D fit and optionally the 2D fit.
    fn run(&mut self, opts: &SpectrumRunOptions) -> Result<&SpectrumAnalysis> {
        self.compute_pspec()?;
        let analysis = self.analysis_mut();
        analysis.compute_radial_pspec(&opts.binning)?;
        analysis.fit_pspec(&opts.fit)?;
        if opts.fit_2d {
            analysis.fit_2dpspec(&opts.fit_2d_options)?;
        }
        Ok(self.analysis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn power_law_spectrum(n: usize, index: f64) -> Map2 {
        let (fy, fx) = frequency_grid(n, n);
        Map2::from_fn(n, n, |x, y| {
            let f = (fx.get(x, y).powi(2) + fy.get(x, y).powi(2)).sqrt();
            if f == 0.0 {
                1.0
            } else {
                f.powf(index)
            }
        })
    }

    #[test]
    fn accessors_report_missing_results() {
        let analysis = SpectrumAnalysis::new(FieldHeader::default());
        assert!(matches!(analysis.ps2d(), Err(StatError::NotComputed { .. })));
        assert!(analysis.fit().is_err());
        assert!(analysis.slope().is_nan());
    }

    #[test]
    fn recovers_index_of_an_ideal_spectrum() {
        let mut analysis = SpectrumAnalysis::new(FieldHeader::default());
        analysis.set_ps2d(power_law_spectrum(64, -3.0));
        analysis
            .compute_radial_pspec(&BinningOptions::default().with_logspacing(true))
            .unwrap();
        let fit = analysis
            .fit_pspec(&SpectrumFitOptions::default().with_cuts(Some(0.05), Some(0.4)))
            .unwrap();
        assert!((fit.slope() + 3.0).abs() < 0.1, "slope {}", fit.slope());
    }

    #[test]
    fn unusable_break_falls_back_to_single_power_law() {
        let mut analysis = SpectrumAnalysis::new(FieldHeader::default());
        analysis.set_ps2d(power_law_spectrum(32, -2.0));
        analysis
            .compute_radial_pspec(&BinningOptions::default())
            .unwrap();
        let fit = analysis
            .fit_pspec(&SpectrumFitOptions::default().with_break(0.49))
            .unwrap();
        assert_eq!(fit.model, crate::fit::FitModel::Linear);
    }

    #[test]
    fn angular_cuts_need_a_pixel_scale() {
        let mut analysis = SpectrumAnalysis::new(FieldHeader::default());
        analysis.set_ps2d(power_law_spectrum(16, -2.0));
        analysis
            .compute_radial_pspec(&BinningOptions::default())
            .unwrap();
        let opts = SpectrumFitOptions::default()
            .with_unit(Frequency::PerDegree)
            .with_cuts(Some(1.0), None);
        assert!(matches!(
            analysis.fit_pspec(&opts),
            Err(StatError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn elliptical_fit_of_isotropic_spectrum_matches_1d_index() {
        let mut analysis = SpectrumAnalysis::new(FieldHeader::default());
        analysis.set_ps2d(power_law_spectrum(32, -2.5));
        analysis
            .compute_radial_pspec(&BinningOptions::default())
            .unwrap();
        analysis.fit_pspec(&SpectrumFitOptions::default()).unwrap();
        let opts = Spectrum2dFitOptions {
            fit: EllipticalFitOptions::default().with_bootstrap(false, 0),
            ..Spectrum2dFitOptions::default()
        };
        let fit = analysis.fit_2dpspec(&opts).unwrap();
        assert!((fit.value("gamma") + 2.5).abs() < 1e-2, "gamma {}", fit.value("gamma"));
    }
}
