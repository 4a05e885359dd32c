//! Pairwise distances between two computed statistics.
pub mod hierarchy;
pub mod powerlaw;

pub use self::hierarchy::{
    HierarchyDistance, HierarchyDistanceReport, HistogramBins, HistogramComparison,
};
pub use self::powerlaw::{
    slope_t_statistic, MvcDistance, PowerLawDistance, PowerLawStatistic, PowerSpectrumDistance,
    SlopeComparison, VcaDistance,
};
