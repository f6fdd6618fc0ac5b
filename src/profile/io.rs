//! Profile persistence: JSON files, lossless round-trip.

use super::DetectorProfile;
use std::fs;
use std::path::Path;

/// Load a profile from a JSON file. Unknown fields are parse errors.
pub fn load_profile(path: &Path) -> Result<DetectorProfile, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read profile {}: {e}", path.display()))?;
    let profile: DetectorProfile = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse profile {}: {e}", path.display()))?;
    Ok(profile)
}

/// Write a profile as pretty-printed JSON, creating parent directories.
pub fn save_profile(path: &Path, profile: &DetectorProfile) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    let contents = serde_json::to_string_pretty(profile)
        .map_err(|e| format!("Failed to serialize profile: {e}"))?;
    fs::write(path, contents).map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::StructureType;

    #[test]
    fn profile_survives_a_file_round_trip() {
        let profile = DetectorProfile::for_structure_type(StructureType::Windmill);
        let dir = std::env::temp_dir().join("structure-detector-profile-io");
        let path = dir.join("windmill.json");
        save_profile(&path, &profile).unwrap();
        let loaded = load_profile(&path).unwrap();
        assert_eq!(loaded, profile);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = load_profile(Path::new("/no/such/profile.json")).unwrap_err();
        assert!(err.contains("/no/such/profile.json"), "{err}");
    }
}
