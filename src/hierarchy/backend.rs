//! Seam between the hierarchy statistics and the segmentation that backs
//! them.
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatError};
use crate::field::FieldData;

/// Build parameters of a hierarchical segmentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DendroParams {
    /// Minimum pixel count of an independent structure.
    pub min_npix: usize,
    /// Pixels below this value are not part of any structure.
    pub min_value: f64,
    /// Minimum contrast of an independent structure above its merge level.
    pub min_delta: f64,
}

impl Default for DendroParams {
    fn default() -> Self {
        Self {
            min_npix: 10,
            min_value: 0.001,
            min_delta: 0.1,
        }
    }
}

/// Neighbourhood used while growing structures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Connectivity {
    /// Axes (storage order) along which the field wraps around.
    pub periodic_axes: Vec<usize>,
}

impl Connectivity {
    pub fn periodic(axes: Vec<usize>) -> Self {
        Self {
            periodic_axes: axes,
        }
    }
}

/// A segmentation that can be pruned in place to larger contrasts.
pub trait Hierarchy: Debug {
    /// Number of live structures (leaves and branches).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Peak value of every live structure, freshly copied.
    fn peak_values(&self) -> Vec<f64>;

    /// Merge or remove structures that are not independent at `min_delta`.
    /// Never adds structures.
    fn prune(&mut self, min_delta: f64);
}

/// Something that can build a [`Hierarchy`] from a field.
pub trait HierarchyBackend: Debug {
    fn build(
        &self,
        data: &FieldData,
        params: &DendroParams,
        connectivity: &Connectivity,
    ) -> Result<Box<dyn Hierarchy>>;
}

/// The compiled-in backend, if any.
#[cfg(feature = "dendrogram")]
pub fn default_backend() -> Result<Box<dyn HierarchyBackend>> {
    Ok(Box::new(super::dendrogram::DendrogramBackend))
}

/// The compiled-in backend, if any.
#[cfg(not(feature = "dendrogram"))]
pub fn default_backend() -> Result<Box<dyn HierarchyBackend>> {
    Err(StatError::MissingBackend)
}

pub(crate) fn ensure_ascending(thresholds: &[f64]) -> Result<()> {
    if thresholds.is_empty() {
        return Err(StatError::InsufficientData {
            context: "hierarchy thresholds",
            needed: 1,
            found: 0,
        });
    }
    if let Some(bad) = thresholds.iter().position(|v| !v.is_finite()) {
        return Err(StatError::invalid(
            "min_deltas",
            format!("threshold {bad} is not finite"),
        ));
    }
    for (i, pair) in thresholds.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(StatError::NonAscendingThresholds {
                index: i + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}
