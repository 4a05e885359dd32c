use std::ops::{Deref, DerefMut};

use log::debug;

use super::analysis::{SpectrumAnalysis, SpectrumStatistic};
use super::engine::channel_power_spectrum;
use crate::distance::PowerLawStatistic;
use crate::error::{Result, StatError};
use crate::field::{Cube, Field, FieldData, FieldHeader, Map2};
use crate::fit::FitResult;

/// Velocity channel analysis: the spatial power spectrum summed over the
/// spectral channels of a cube.
#[derive(Clone, Debug)]
pub struct Vca {
    cube: Cube,
    analysis: SpectrumAnalysis,
}

impl Vca {
    pub fn new(cube: Cube, header: FieldHeader) -> Self {
        Self {
            cube,
            analysis: SpectrumAnalysis::new(header),
        }
    }

    pub fn from_field(field: Field) -> Result<Self> {
        let (data, header) = field.into_parts();
        match data {
            FieldData::Cube(cube) => Ok(Self::new(cube, header)),
            FieldData::Map(_) => Err(StatError::invalid(
                "field",
                "velocity channel analysis takes a spectral cube",
            )),
        }
    }

    /// Average groups of `factor` channels, widening the channel step in
    /// the header accordingly.
    pub fn with_channel_binning(self, factor: usize) -> Result<Self> {
        let cube = self.cube.rebin_spectral(factor)?;
        let mut header = self.analysis.header().clone();
        header.spectral_step = header.spectral_step.map(|s| s * factor as f64);
        debug!(
            "Vca: rebinned {} channels to {} (factor {factor})",
            self.cube.nchan, cube.nchan
        );
        Ok(Self::new(cube, header))
    }

    pub fn cube(&self) -> &Cube {
        &self.cube
    }
}

impl SpectrumStatistic for Vca {
    fn analysis(&self) -> &SpectrumAnalysis {
        &self.analysis
    }

    fn analysis_mut(&mut self) -> &mut SpectrumAnalysis {
        &mut self.analysis
    }

    fn compute_pspec(&mut self) -> Result<&Map2> {
        let ps = channel_power_spectrum(&self.cube)?;
        self.analysis.set_ps2d(ps);
        self.analysis.ps2d()
    }
}

impl Deref for Vca {
    type Target = SpectrumAnalysis;

    fn deref(&self) -> &SpectrumAnalysis {
        &self.analysis
    }
}

impl DerefMut for Vca {
    fn deref_mut(&mut self) -> &mut SpectrumAnalysis {
        &mut self.analysis
    }
}

impl PowerLawStatistic for Vca {
    fn power_law_fit(&self) -> Result<&FitResult> {
        self.analysis.fit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_binning_scales_the_spectral_step() {
        let cube = Cube::new(10, 4, 4);
        let header = FieldHeader::for_ndim(3).with_spectral_step(0.5);
        let vca = Vca::new(cube, header).with_channel_binning(3).unwrap();
        assert_eq!(vca.cube().nchan, 3);
        assert_eq!(vca.header().spectral_step, Some(1.5));
    }
}
