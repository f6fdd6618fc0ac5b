#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod detector;
pub mod diagnostics;
pub mod profile;
pub mod raster;

// “Expert” modules – still public, but considered unstable internals.
// (You can tighten or feature-gate these later.)
pub mod aggregate;
pub mod config;
pub mod features;
pub mod synthetic;

// --- High-level re-exports -------------------------------------------------

// Main entry points: detector + results.
pub use crate::detector::{
    CancelToken, DetectError, DetectOptions, DetectionMetadata, DetectionResult, StructureDetector,
};

// Profiles: what to look for and how cautiously to decide.
pub use crate::profile::{DetectorProfile, StructureType};

// Input rasters.
pub use crate::raster::{ElevationPatch, HeightGrid};

// Streaming/reporting types returned alongside detection results.
pub use crate::diagnostics::{DetectionPhase, ProgressEvent, TimingBreakdown};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use structure_detector::prelude::*;
/// use structure_detector::synthetic::dome_patch;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let profile = DetectorProfile::for_structure_type(StructureType::Windmill);
/// let detector = StructureDetector::new(profile).map_err(|issues| issues.join("; "))?;
///
/// let patch = dome_patch(41, 12.0, 2.5, 1.0);
/// let result = detector.detect(&patch)?;
/// println!(
///     "detected={} score={:.3} confidence={:.3}",
///     result.detected, result.final_score, result.confidence
/// );
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::detector::{DetectOptions, StructureDetector};
    pub use crate::profile::{DetectorProfile, StructureType};
    pub use crate::raster::{ElevationPatch, HeightGrid};
}
