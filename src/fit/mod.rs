//! Power-law fitting: straight and broken lines in log-log space, and the
//! 2D elliptical power law used on full power spectra.
pub mod elliptical;
pub mod levmar;
pub mod linear;
pub mod powerlaw;
pub mod result;
pub mod segmented;
pub mod stats;
pub mod transform;

pub use self::elliptical::{
    ellipticity, ellipticity_with_error, fit_elliptical_powerlaw, log_elliptical_powerlaw,
    EllipticalFitOptions,
};
pub use self::levmar::{levenberg_marquardt, LeastSquaresProblem, LevMarOptions, LevMarReport};
pub use self::linear::{fit_line, least_squares, LinearFit};
pub use self::powerlaw::{fit_power_law, select_log_points, LogPoints, PowerLawFitOptions};
pub use self::result::{FitMethod, FitModel, FitParameter, FitResult};
pub use self::segmented::{fit_segmented, SegmentedFit};
pub use self::transform::{
    interval_transform, interval_transform_stderr, inverse_interval_transform,
    inverse_interval_transform_stderr,
};
