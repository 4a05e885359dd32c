#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod distance;
pub mod error;
pub mod field;
pub mod hierarchy;
pub mod spectrum;

// Building blocks and demo tooling.
pub mod config;
pub mod diagnostics;
pub mod fit;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{Result, StatError};
pub use crate::field::{Cube, Field, FieldData, FieldHeader, FieldInput, Map2};

// Statistics.
pub use crate::hierarchy::{DendroParams, HierarchyRunOptions, HierarchyStats};
pub use crate::spectrum::{
    BinningOptions, Mvc, PowerSpectrum, SpectrumRunOptions, SpectrumStatistic, Vca,
};

// Distances.
pub use crate::distance::{
    HierarchyDistance, MvcDistance, PowerLawStatistic, PowerSpectrumDistance, VcaDistance,
};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use turbulence_stats::prelude::*;
///
/// # fn main() -> Result<()> {
/// let map = Map2::from_fn(64, 64, |x, y| ((x * 7 + y * 3) % 11) as f64);
/// let mut pspec = PowerSpectrum::new(map, FieldHeader::default());
/// pspec.run(&SpectrumRunOptions::default())?;
/// println!("slope={:.3} +/- {:.3}", pspec.slope(), pspec.slope_err());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::error::Result;
    pub use crate::{
        BinningOptions, DendroParams, Field, FieldHeader, HierarchyStats, Map2, PowerSpectrum,
        SpectrumRunOptions, SpectrumStatistic,
    };
}
