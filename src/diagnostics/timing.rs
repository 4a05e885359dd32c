use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Timing entry describing a single stage of a statistic run (spectrum,
/// binning, fit, pruning, ...).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Aggregated timing trace for one demo run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn with_total(total_ms: f64) -> Self {
        Self {
            total_ms,
            stages: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming::new(label, elapsed_ms));
    }

    /// Run `f`, recording its wall time under `label`.
    pub fn measure<T>(&mut self, label: impl Into<String>, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.push(label, elapsed_ms(start));
        out
    }

    /// Set the total to the sum of the recorded stages.
    pub fn close(&mut self) {
        self.total_ms = self.stages.iter().map(|s| s.elapsed_ms).sum();
    }
}

pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_records_stage_and_returns_value() {
        let mut timings = TimingBreakdown::default();
        let v = timings.measure("answer", || 42);
        timings.push("fixed", 1.5);
        timings.close();
        assert_eq!(v, 42);
        assert_eq!(timings.stages.len(), 2);
        assert_eq!(timings.stages[0].label, "answer");
        assert!(timings.total_ms >= 1.5);
    }
}
