//! Spatial-frequency units and their conversion to cycles per pixel.
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatError};
use crate::field::FieldHeader;

/// Unit of a spatial-frequency value supplied by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    PerPixel,
    PerDegree,
    PerParsec,
}

impl Frequency {
    /// Convert `value`, expressed in `self`, to cycles per pixel.
    pub fn to_per_pixel(self, value: f64, header: &FieldHeader) -> Result<f64> {
        match self {
            Frequency::PerPixel => Ok(value),
            Frequency::PerDegree => Ok(value * pixel_scale(header)?),
            Frequency::PerParsec => {
                let distance = header.distance_pc.ok_or_else(|| {
                    StatError::invalid("distance_pc", "required for per-parsec frequencies")
                })?;
                if !(distance > 0.0) {
                    return Err(StatError::invalid("distance_pc", "must be positive"));
                }
                Ok(value * distance * pixel_scale(header)?.to_radians())
            }
        }
    }

    /// Inverse of [`Frequency::to_per_pixel`].
    pub fn from_per_pixel(self, value: f64, header: &FieldHeader) -> Result<f64> {
        let unit = self.to_per_pixel(1.0, header)?;
        Ok(value / unit)
    }
}

fn pixel_scale(header: &FieldHeader) -> Result<f64> {
    match header.pixel_scale_deg {
        Some(scale) if scale > 0.0 => Ok(scale),
        Some(_) => Err(StatError::invalid("pixel_scale_deg", "must be positive")),
        None => Err(StatError::invalid(
            "pixel_scale_deg",
            "header has no pixel scale for angular frequencies",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_degree_and_per_parsec_agree_on_the_same_cut() {
        let header = FieldHeader::for_ndim(2)
            .with_pixel_scale_deg(0.01)
            .with_distance_pc(250.0);
        let per_pix = 0.1;
        let per_deg = Frequency::PerDegree.from_per_pixel(per_pix, &header).unwrap();
        let per_pc = Frequency::PerParsec.from_per_pixel(per_pix, &header).unwrap();
        let back_deg = Frequency::PerDegree.to_per_pixel(per_deg, &header).unwrap();
        let back_pc = Frequency::PerParsec.to_per_pixel(per_pc, &header).unwrap();
        assert!((back_deg - per_pix).abs() < 1e-12);
        assert!((back_pc - per_pix).abs() < 1e-12);
        assert!((per_deg - 10.0).abs() < 1e-9, "per_deg={per_deg}");
    }

    #[test]
    fn missing_header_information_is_rejected() {
        let header = FieldHeader::for_ndim(2);
        assert!(Frequency::PerDegree.to_per_pixel(1.0, &header).is_err());
        let header = header.with_pixel_scale_deg(0.01);
        assert!(Frequency::PerParsec.to_per_pixel(1.0, &header).is_err());
        assert_eq!(Frequency::PerPixel.to_per_pixel(0.3, &header).unwrap(), 0.3);
    }
}
