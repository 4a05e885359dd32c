//! I/O helpers for fields and JSON reports.
//!
//! - `load_field_json`: read a field stored as `{"shape", "data", "header"}`.
//!   `null` entries in `data` become NaN.
//! - `load_map_png`: read a PNG/JPEG/etc. into a map scaled to [0, 1].
//! - `load_field`: pick one of the above from the file extension.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{Cube, Field, FieldData, FieldHeader, Map2};
use crate::error::{Result, StatError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FieldFile {
    shape: Vec<usize>,
    data: Vec<Option<f64>>,
    #[serde(default)]
    header: Option<FieldHeader>,
}

/// Load a 2D map or 3D cube from a JSON field file.
pub fn load_field_json(path: &Path) -> Result<Field> {
    let text = fs::read_to_string(path)
        .map_err(|e| StatError::Io(format!("failed to read {}: {e}", path.display())))?;
    let file: FieldFile = serde_json::from_str(&text).map_err(|e| {
        StatError::Serialization(format!("failed to parse {}: {e}", path.display()))
    })?;
    let values: Vec<f64> = file
        .data
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    let data = match file.shape.as_slice() {
        [h, w] => FieldData::Map(Map2::from_vec(*w, *h, values)?),
        [c, h, w] => FieldData::Cube(Cube::from_vec(*c, *h, *w, values)?),
        other => {
            return Err(StatError::invalid(
                "shape",
                format!("expected 2 or 3 dimensions, got {}", other.len()),
            ))
        }
    };
    match file.header {
        Some(header) => Field::new(data, header),
        None => Ok(Field::without_header(data)),
    }
}

/// Load an image from disk as a grayscale map with values in [0, 1].
pub fn load_map_png(path: &Path) -> Result<Map2> {
    let img = image::open(path)
        .map_err(|e| StatError::Io(format!("failed to open {}: {e}", path.display())))?
        .into_luma8();
    let w = img.width() as usize;
    let h = img.height() as usize;
    let data = img.into_raw().into_iter().map(|v| v as f64 / 255.0).collect();
    Map2::from_vec(w, h, data)
}

/// Load a field from JSON, or from an image when the extension says so.
/// Image maps carry no header.
pub fn load_field(path: &Path) -> Result<Field> {
    let is_image = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false);
    if is_image {
        Ok(Field::map(load_map_png(path)?))
    } else {
        load_field_json(path)
    }
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        StatError::Serialization(format!("failed to serialize {}: {e}", path.display()))
    })?;
    fs::write(path, json)
        .map_err(|e| StatError::Io(format!("failed to write {}: {e}", path.display())))
}

/// Read a JSON value previously written with [`write_json_file`].
pub fn read_json_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| StatError::Io(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| {
        StatError::Serialization(format!("failed to parse {}: {e}", path.display()))
    })
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                StatError::Io(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
    }
    Ok(())
}

/// `serde_json` writes non-finite floats as `null`; these read them back as
/// NaN.
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer};

    pub fn f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }

    pub fn vec<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let raw = Vec::<Option<f64>>::deserialize(d)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    pub fn opt_vec<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<f64>>, D::Error> {
        let raw = Option::<Vec<Option<f64>>>::deserialize(d)?;
        Ok(raw.map(|v| v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_field_roundtrip_keeps_nan_as_null() {
        let dir = std::env::temp_dir().join("turbulence_stats_io_test");
        let path = dir.join("field.json");
        let text = r#"{"shape": [2, 2], "data": [1.0, null, 3.0, 4.0]}"#;
        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, text).unwrap();
        let field = load_field_json(&path).unwrap();
        let map = field.as_map().expect("2D field");
        assert_eq!(map.w, 2);
        assert!(map.data[1].is_nan());
        assert!(!field.has_header());
    }
}
