use std::ops::{Deref, DerefMut};

use log::debug;

use super::analysis::{SpectrumAnalysis, SpectrumStatistic};
use super::engine::modified_power_spectrum;
use crate::distance::PowerLawStatistic;
use crate::error::Result;
use crate::field::map::ensure_same_shape;
use crate::field::{FieldHeader, Map2};
use crate::fit::FitResult;

/// Modified velocity centroids: the power spectrum of the centroid map with
/// the line-width contribution removed.
#[derive(Clone, Debug)]
pub struct Mvc {
    centroid: Map2,
    moment0: Map2,
    linewidth: Map2,
    analysis: SpectrumAnalysis,
}

impl Mvc {
    /// All three maps must share a shape. NaNs are replaced with each map's
    /// minimum finite value.
    pub fn new(
        mut centroid: Map2,
        mut moment0: Map2,
        mut linewidth: Map2,
        header: FieldHeader,
    ) -> Result<Self> {
        ensure_same_shape(&centroid, &moment0)?;
        ensure_same_shape(&centroid, &linewidth)?;
        centroid.fill_nans_with_min();
        moment0.fill_nans_with_min();
        linewidth.fill_nans_with_min();
        Ok(Self {
            centroid,
            moment0,
            linewidth,
            analysis: SpectrumAnalysis::new(header),
        })
    }

    /// Weight every map by its inverse-variance error map before the
    /// spectrum is taken.
    pub fn weighted_by_error(
        maps: [&Map2; 3],
        errors: [&Map2; 3],
        header: FieldHeader,
    ) -> Result<Self> {
        let weight = |m: &Map2, e: &Map2| m.zip_map(e, |v, err| v / (err * err));
        let centroid = weight(maps[0], errors[0])?;
        let moment0 = weight(maps[1], errors[1])?;
        let linewidth = weight(maps[2], errors[2])?;
        debug!("Mvc: weighting centroid, moment0 and line width by inverse variance");
        Self::new(centroid, moment0, linewidth, header)
    }

    pub fn centroid(&self) -> &Map2 {
        &self.centroid
    }

    pub fn moment0(&self) -> &Map2 {
        &self.moment0
    }

    pub fn linewidth(&self) -> &Map2 {
        &self.linewidth
    }
}

impl SpectrumStatistic for Mvc {
    fn analysis(&self) -> &SpectrumAnalysis {
        &self.analysis
    }

    fn analysis_mut(&mut self) -> &mut SpectrumAnalysis {
        &mut self.analysis
    }

    fn compute_pspec(&mut self) -> Result<&Map2> {
        let ps = modified_power_spectrum(&self.centroid, &self.moment0, &self.linewidth)?;
        self.analysis.set_ps2d(ps);
        self.analysis.ps2d()
    }
}

impl Deref for Mvc {
    type Target = SpectrumAnalysis;

    fn deref(&self) -> &SpectrumAnalysis {
        &self.analysis
    }
}

impl DerefMut for Mvc {
    fn deref_mut(&mut self) -> &mut SpectrumAnalysis {
        &mut self.analysis
    }
}

impl PowerLawStatistic for Mvc {
    fn power_law_fit(&self) -> Result<&FitResult> {
        self.analysis.fit()
    }
}
