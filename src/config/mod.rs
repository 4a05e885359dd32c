//! JSON configs read by the demo tools.
pub mod dendro;
pub mod pspec;

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}
