//! Coordinate descriptor attached to a field.
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Spatial,
    Spectral,
}

/// WCS-like metadata needed by the statistics.
///
/// Axes are listed in storage order (slowest varying first), so a cube is
/// `[Spectral, Spatial, Spatial]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldHeader {
    /// Angular size of one spatial pixel in degrees.
    pub pixel_scale_deg: Option<f64>,
    /// Width of one spectral channel (e.g. m/s).
    pub spectral_step: Option<f64>,
    /// Physical distance to the region in parsec.
    pub distance_pc: Option<f64>,
    pub axes: Vec<AxisKind>,
}

impl Default for FieldHeader {
    fn default() -> Self {
        Self::for_ndim(2)
    }
}

impl FieldHeader {
    /// Pixel-unit header with axes inferred from dimensionality.
    pub fn for_ndim(ndim: usize) -> Self {
        let axes = match ndim {
            3 => vec![AxisKind::Spectral, AxisKind::Spatial, AxisKind::Spatial],
            n => vec![AxisKind::Spatial; n],
        };
        Self {
            pixel_scale_deg: None,
            spectral_step: None,
            distance_pc: None,
            axes,
        }
    }

    pub fn with_pixel_scale_deg(mut self, scale: f64) -> Self {
        self.pixel_scale_deg = Some(scale);
        self
    }

    pub fn with_spectral_step(mut self, step: f64) -> Self {
        self.spectral_step = Some(step);
        self
    }

    pub fn with_distance_pc(mut self, distance: f64) -> Self {
        self.distance_pc = Some(distance);
        self
    }

    /// Storage-order indices of the spatial axes.
    pub fn spatial_axes(&self) -> Vec<usize> {
        self.axes
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind == AxisKind::Spatial)
            .map(|(i, _)| i)
            .collect()
    }
}
