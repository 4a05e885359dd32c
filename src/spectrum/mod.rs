//! Spatial power spectra and their radial profiles.
pub mod analysis;
pub mod engine;
pub mod fft;
pub mod mvc;
pub mod power;
pub mod radial;
pub mod units;
pub mod vca;

pub use self::analysis::{
    Spectrum2dFitOptions, SpectrumAnalysis, SpectrumFitOptions, SpectrumRunOptions,
    SpectrumStatistic,
};
pub use self::engine::{channel_power_spectrum, modified_power_spectrum, power_spectrum_2d};
pub use self::mvc::Mvc;
pub use self::power::PowerSpectrum;
pub use self::radial::{radial_profile, BinningOptions, RadialProfile};
pub use self::units::Frequency;
pub use self::vca::Vca;
