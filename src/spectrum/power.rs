use std::ops::{Deref, DerefMut};

use super::analysis::{SpectrumAnalysis, SpectrumStatistic};
use super::engine::power_spectrum_2d;
use crate::distance::PowerLawStatistic;
use crate::error::{Result, StatError};
use crate::field::{Field, FieldData, FieldHeader, Map2};
use crate::fit::FitResult;

/// Spatial power spectrum of a 2D map (typically integrated intensity).
#[derive(Clone, Debug)]
pub struct PowerSpectrum {
    map: Map2,
    analysis: SpectrumAnalysis,
}

impl PowerSpectrum {
    /// NaNs in `map` are replaced with its minimum finite value.
    pub fn new(mut map: Map2, header: FieldHeader) -> Self {
        map.fill_nans_with_min();
        Self {
            map,
            analysis: SpectrumAnalysis::new(header),
        }
    }

    pub fn from_field(field: Field) -> Result<Self> {
        let (data, header) = field.into_parts();
        match data {
            FieldData::Map(map) => Ok(Self::new(map, header)),
            FieldData::Cube(_) => Err(StatError::invalid(
                "field",
                "the spatial power spectrum takes a 2D map",
            )),
        }
    }

    pub fn map(&self) -> &Map2 {
        &self.map
    }
}

impl SpectrumStatistic for PowerSpectrum {
    fn analysis(&self) -> &SpectrumAnalysis {
        &self.analysis
    }

    fn analysis_mut(&mut self) -> &mut SpectrumAnalysis {
        &mut self.analysis
    }

    fn compute_pspec(&mut self) -> Result<&Map2> {
        let ps = power_spectrum_2d(&self.map)?;
        self.analysis.set_ps2d(ps);
        self.analysis.ps2d()
    }
}

impl Deref for PowerSpectrum {
    type Target = SpectrumAnalysis;

    fn deref(&self) -> &SpectrumAnalysis {
        &self.analysis
    }
}

impl DerefMut for PowerSpectrum {
    fn deref_mut(&mut self) -> &mut SpectrumAnalysis {
        &mut self.analysis
    }
}

impl PowerLawStatistic for PowerSpectrum {
    fn power_law_fit(&self) -> Result<&FitResult> {
        self.analysis.fit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_input_is_rejected() {
        let field = Field::without_header(FieldData::Cube(crate::field::Cube::new(3, 4, 4)));
        assert!(PowerSpectrum::from_field(field).is_err());
    }

    #[test]
    fn nans_are_cleaned_before_the_spectrum() {
        let mut map = Map2::from_fn(8, 8, |x, y| (x + 2 * y) as f64);
        map.set(3, 3, f64::NAN);
        let mut ps = PowerSpectrum::new(map, FieldHeader::default());
        assert_eq!(ps.map().get(3, 3), 0.0);
        assert!(ps.compute_pspec().is_ok());
    }
}
