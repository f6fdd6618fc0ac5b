//! I/O helpers for elevation patches and JSON reports.
//!
//! - `load_patch`: read an [`ElevationPatch`] from a JSON document.
//! - `save_patch`: pretty-print a patch back to disk.
//! - `write_json_file`: pretty-print any serializable value to disk.

use super::patch::ElevationPatch;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an elevation patch from a JSON document.
pub fn load_patch(path: &Path) -> Result<ElevationPatch, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read patch {}: {e}", path.display()))?;
    let patch: ElevationPatch = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse patch {}: {e}", path.display()))?;
    if !patch.is_well_formed() {
        return Err(format!(
            "Patch {} is not usable: empty raster, non-finite cells, or bad resolution",
            path.display()
        ));
    }
    Ok(patch)
}

/// Save an elevation patch as pretty JSON.
pub fn save_patch(path: &Path, patch: &ElevationPatch) -> Result<(), String> {
    write_json_file(path, patch)
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::HeightGrid;

    #[test]
    fn patch_survives_a_file_round_trip() {
        let patch = ElevationPatch::from_grid(
            HeightGrid::from_fn(5, 4, |x, y| x as f32 + 10.0 * y as f32),
            0.5,
        )
        .with_source("lidar:tile-0042")
        .with_center(51.1789, -1.8262);
        let dir = std::env::temp_dir().join("structure-detector-raster-io");
        let path = dir.join("tile.json");
        save_patch(&path, &patch).unwrap();
        let loaded = load_patch(&path).unwrap();
        assert_eq!(loaded.elevation, patch.elevation);
        assert_eq!(loaded.center_lat, patch.center_lat);
        assert_eq!(loaded.center_lon, patch.center_lon);
        assert_eq!(loaded.source, patch.source);
        assert_eq!(loaded.resolution_m, patch.resolution_m);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unusable_patch_is_rejected_on_load() {
        let patch = ElevationPatch::from_grid(HeightGrid::new(4, 4), 0.0);
        let dir = std::env::temp_dir().join("structure-detector-raster-io-bad");
        let path = dir.join("bad.json");
        save_patch(&path, &patch).unwrap();
        let err = load_patch(&path).unwrap_err();
        assert!(err.contains("not usable"), "{err}");
        let _ = fs::remove_dir_all(&dir);
    }
}
