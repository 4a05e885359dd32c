//! Error taxonomy shared by every statistic in the crate.
//!
//! Fatal conditions surface as [`StatError`]. Degraded-precision conditions
//! (missing covariance, a tail fit with a single threshold, too few samples
//! for a histogram) are logged with `log::warn!` and never reach this type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatError>;

#[derive(Debug, Error)]
pub enum StatError {
    /// Co-registered fields do not share a shape.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("insufficient data for {context}: need {needed}, found {found}")]
    InsufficientData {
        context: &'static str,
        needed: usize,
        found: usize,
    },
    #[error("non-finite input in {context}")]
    NonFiniteInput { context: &'static str },
    /// No hierarchical segmentation backend was compiled in or supplied.
    #[error("no hierarchical segmentation backend available (enable the `dendrogram` feature or pass a backend)")]
    MissingBackend,
    #[error("thresholds must be strictly ascending: index {index} has {current} after {previous}")]
    NonAscendingThresholds {
        index: usize,
        previous: f64,
        current: f64,
    },
    /// A normal-equation or damping system could not be solved.
    #[error("singular system in {context}")]
    SingularFit { context: &'static str },
    /// Every pixel sits at zero distance from the centre (single-pixel input).
    #[error("field has no non-zero radial distance")]
    DegenerateField,
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("{what} has not been computed yet")]
    NotComputed { what: &'static str },
    #[error("i/o error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StatError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        StatError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for StatError {
    fn from(err: std::io::Error) -> Self {
        StatError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StatError {
    fn from(err: serde_json::Error) -> Self {
        StatError::Serialization(err.to_string())
    }
}
