//! Run configuration for the `detect_demo` binary.

use crate::detector::DetectOptions;
use crate::profile::{load_profile, DetectorProfile, StructureType};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Write the full detection result here as pretty JSON.
    pub json_out: Option<PathBuf>,
}

#[derive(Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Elevation patch to score.
    pub patch_path: PathBuf,
    /// Explicit profile file; wins over `structure_type`.
    #[serde(default)]
    pub profile_path: Option<PathBuf>,
    /// Preset to use when no profile file is given.
    #[serde(default)]
    pub structure_type: Option<StructureType>,
    /// Print per-module progress as results arrive.
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub stop_on_early_decision: bool,
    /// Collection deadline override, in seconds.
    #[serde(default)]
    pub module_timeout_secs: Option<f64>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl RuntimeConfig {
    /// Profile this run asks for: explicit file, else preset, else default.
    pub fn resolve_profile(&self) -> Result<DetectorProfile, String> {
        if let Some(path) = &self.profile_path {
            return load_profile(path);
        }
        Ok(match self.structure_type {
            Some(structure_type) => DetectorProfile::for_structure_type(structure_type),
            None => DetectorProfile::default(),
        })
    }

    pub fn detect_options(&self) -> DetectOptions {
        let mut options = DetectOptions {
            stop_on_early_decision: self.stop_on_early_decision,
            ..DetectOptions::default()
        };
        if let Some(secs) = self.module_timeout_secs {
            options.module_timeout = Duration::from_secs_f64(secs.max(0.0));
        }
        options
    }
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}
