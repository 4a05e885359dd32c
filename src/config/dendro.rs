use crate::distance::HistogramBins;
use crate::hierarchy::{DendroParams, HierarchyRunOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub nbins: HistogramBins,
    /// Levels must keep more than this many structures to be compared.
    pub min_features: usize,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            nbins: HistogramBins::Best,
            min_features: 100,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DendroOutputConfig {
    pub result_json: PathBuf,
    /// Persist the computed statistics for later reloading.
    #[serde(default)]
    pub saved_stats: Option<PathBuf>,
    #[serde(default)]
    pub keep_data: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DendroDemoConfig {
    /// JSON field file or grayscale PNG.
    pub input: PathBuf,
    #[serde(default)]
    pub compare_with: Option<PathBuf>,
    /// Ascending contrast thresholds; `[params.min_delta]` when absent.
    #[serde(default)]
    pub min_deltas: Option<Vec<f64>>,
    #[serde(default)]
    pub params: DendroParams,
    #[serde(default)]
    pub run: HierarchyRunOptions,
    #[serde(default)]
    pub distance: DistanceConfig,
    pub output: DendroOutputConfig,
}

impl DendroDemoConfig {
    /// Thresholds used for every dataset of the run.
    pub fn resolve_min_deltas(&self) -> Vec<f64> {
        self.min_deltas
            .clone()
            .unwrap_or_else(|| vec![self.params.min_delta])
    }
}

pub fn load_config(path: &Path) -> Result<DendroDemoConfig, String> {
    super::read_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let text = r#"{
            "input": "field.json",
            "params": {"min_npix": 4},
            "distance": {"nbins": {"fixed": 12}},
            "output": {"result_json": "out/dendro.json"}
        }"#;
        let config: DendroDemoConfig = serde_json::from_str(text).unwrap();
        assert_eq!(config.params.min_npix, 4);
        assert_eq!(config.params.min_delta, 0.1);
        assert_eq!(config.resolve_min_deltas(), vec![0.1]);
        assert_eq!(config.distance.nbins, HistogramBins::Fixed(12));
        assert_eq!(config.distance.min_features, 100);
        assert_eq!(config.run.window, 5);
        assert!(!config.output.keep_data);
    }
}
