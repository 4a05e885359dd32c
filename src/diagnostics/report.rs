use crate::distance::{HierarchyDistanceReport, SlopeComparison};
use crate::error::Result;
use crate::field::FieldData;
use crate::fit::{ellipticity_with_error, FitResult};
use crate::hierarchy::{HierarchyStats, TailFit};
use crate::spectrum::{RadialProfile, SpectrumAnalysis};
use serde::Serialize;

use super::timing::TimingBreakdown;

fn format_value(val: f64) -> String {
    if val.is_finite() {
        format!("{val:.4}")
    } else {
        "-".to_string()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub label: String,
    pub shape: Vec<usize>,
}

impl InputDescriptor {
    pub fn new(label: impl Into<String>, data: &FieldData) -> Self {
        Self {
            label: label.into(),
            shape: data.shape(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EllipticityReport {
    pub value: f64,
    pub stderr: f64,
}

/// Results of one spectrum statistic.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumSummary {
    pub input: InputDescriptor,
    pub slope: f64,
    pub slope_err: f64,
    pub profile: RadialProfile,
    pub fit: FitResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_2d: Option<FitResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ellipticity: Option<EllipticityReport>,
}

impl SpectrumSummary {
    /// Collect the results of a completed run.
    pub fn from_analysis(input: InputDescriptor, analysis: &SpectrumAnalysis) -> Result<Self> {
        let fit_2d = analysis.fit_2d().ok().cloned();
        let ellipticity = fit_2d.as_ref().map(|fit| {
            let (value, stderr) = ellipticity_with_error(fit);
            EllipticityReport { value, stderr }
        });
        Ok(Self {
            input,
            slope: analysis.slope(),
            slope_err: analysis.slope_err(),
            profile: analysis.profile()?.clone(),
            fit: analysis.fit()?.clone(),
            fit_2d,
            ellipticity,
        })
    }

    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{}: slope={} +/- {} ({} bins fitted)",
            self.input.label,
            format_value(self.slope),
            format_value(self.slope_err),
            self.fit.nobs
        );
        if let Some(e) = self.ellipticity {
            line.push_str(&format!(
                ", ellipticity={} +/- {}",
                format_value(e.value),
                format_value(e.stderr)
            ));
        }
        line
    }
}

/// JSON report written by `pspec_demo`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumReport {
    pub kind: String,
    pub datasets: Vec<SpectrumSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<SlopeComparison>,
    pub timings: TimingBreakdown,
}

/// Results of one dendrogram statistic.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchySummary {
    pub input: InputDescriptor,
    pub thresholds: Vec<f64>,
    pub feature_counts: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail: Option<TailFit>,
    /// Levels whose histogram had enough peaks to be filled.
    pub histogram_levels: usize,
}

impl HierarchySummary {
    pub fn from_stats(input: InputDescriptor, stats: &HierarchyStats) -> Result<Self> {
        let levels = stats.levels()?;
        Ok(Self {
            input,
            thresholds: levels.iter().map(|l| l.threshold).collect(),
            feature_counts: levels.iter().map(|l| l.feature_count).collect(),
            tail: stats.tail().cloned(),
            histogram_levels: stats
                .histograms()
                .map_or(0, |h| h.iter().filter(|h| !h.is_empty()).count()),
        })
    }

    pub fn summary_line(&self) -> String {
        let tail = self
            .tail
            .as_ref()
            .map(|t| {
                format!(
                    "tail slope={} +/- {} from delta={}",
                    format_value(t.fit.slope()),
                    format_value(t.fit.slope_err()),
                    format_value(t.break_delta)
                )
            })
            .unwrap_or_else(|| "no tail fit".to_string());
        format!(
            "{}: {} thresholds, features {:?}, {}",
            self.input.label,
            self.thresholds.len(),
            self.feature_counts,
            tail
        )
    }
}

/// JSON report written by `dendro_demo`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyReport {
    pub datasets: Vec<HierarchySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<HierarchyDistanceReport>,
    pub timings: TimingBreakdown,
}
