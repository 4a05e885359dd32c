//! Dendrogram statistics: a hierarchical segmentation pruned over
//! increasing contrast thresholds, and the summaries drawn from it.
pub mod backend;
#[cfg(feature = "dendrogram")]
pub mod dendrogram;
pub mod histogram;
pub mod stats;
pub mod window;

pub use self::backend::{default_backend, Connectivity, DendroParams, Hierarchy, HierarchyBackend};
#[cfg(feature = "dendrogram")]
pub use self::dendrogram::{Dendrogram, DendrogramBackend};
pub use self::histogram::{
    common_histogram_bins, ecdf, hellinger, histogram, histogram_on_edges, standardize, Histogram,
};
pub use self::stats::{
    HierarchyLevel, HierarchyResults, HierarchyRunOptions, HierarchyStats, TailFit,
};
pub use self::window::{std_window, std_window_profile};
