use crate::field::FieldHeader;
use crate::spectrum::SpectrumRunOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Which spectrum statistic to run and where its inputs live.
///
/// Map and cube paths ending in `.png` are read as grayscale images,
/// everything else as JSON field files.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpectrumInput {
    Power {
        path: PathBuf,
    },
    Vca {
        path: PathBuf,
        #[serde(default)]
        channel_binning: Option<usize>,
    },
    Mvc {
        centroid: PathBuf,
        moment0: PathBuf,
        linewidth: PathBuf,
    },
}

impl SpectrumInput {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SpectrumInput::Power { .. } => "power",
            SpectrumInput::Vca { .. } => "vca",
            SpectrumInput::Mvc { .. } => "mvc",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PspecOutputConfig {
    pub result_json: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PspecDemoConfig {
    pub input: SpectrumInput,
    /// Second dataset of the same kind; enables the slope distance.
    #[serde(default)]
    pub compare_with: Option<SpectrumInput>,
    /// Replaces the header of inputs that carry none (PNG maps, bare JSON).
    #[serde(default)]
    pub header: Option<FieldHeader>,
    #[serde(default)]
    pub run: SpectrumRunOptions,
    pub output: PspecOutputConfig,
}

pub fn load_config(path: &Path) -> Result<PspecDemoConfig, String> {
    super::read_config(path)
}
