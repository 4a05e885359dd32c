//! Serializable reports and stage timings produced by the demo tools.

pub mod report;
pub mod timing;

pub use report::{
    EllipticityReport, HierarchyReport, HierarchySummary, InputDescriptor, SpectrumReport,
    SpectrumSummary,
};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
