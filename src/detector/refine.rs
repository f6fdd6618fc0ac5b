//! Ambiguity-driven refinement helpers.
//!
//! Two strategies, applied in sequence by the pipeline when a first pass is
//! ambiguous:
//! 1. Recentering: smooth the raster, find its dominant peak and re-crop the
//!    window around it, so an off-centre structure stops splitting evidence
//!    across modules that assume a centred target.
//! 2. Reweighting: scale each feature's weight by how decisively its module
//!    committed, so fence-sitters lose influence on the blend.

use std::collections::BTreeMap;

use log::debug;

use crate::aggregate::{is_ambiguous, AggregationResult};
use crate::features::{FeatureKind, FeatureResult};
use crate::profile::DetectorProfile;
use crate::raster::filter::gaussian_blur;
use crate::raster::{ElevationPatch, HeightGrid};

/// Smallest crop worth recomputing modules on.
const MIN_RECROP_SIDE: usize = 8;
/// Recentering only fires when the peak sits off-centre by more than this
/// fraction of the short side.
const RECENTER_MIN_OFFSET: f32 = 0.1;
/// Confidence gain a round must show to replace a still-ambiguous best.
const MIN_CONFIDENCE_GAIN: f32 = 0.1;

/// Locate the dominant peak of the smoothed raster.
///
/// Ties break toward the grid centre, so a perfectly flat raster reports its
/// own centre instead of the top-left corner.
pub(super) fn dominant_peak(grid: &HeightGrid, radius_px: f32) -> (usize, usize) {
    let sigma = (0.25 * radius_px).max(1.0);
    let smooth = gaussian_blur(grid, sigma);
    let (cx, cy) = smooth.center();
    let mut best = (0usize, 0usize);
    let mut best_v = f32::NEG_INFINITY;
    let mut best_d = f32::INFINITY;
    for y in 0..smooth.h {
        for x in 0..smooth.w {
            let v = smooth.get(x, y);
            let d = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
            if v > best_v || (v == best_v && d < best_d) {
                best_v = v;
                best_d = d;
                best = (x, y);
            }
        }
    }
    best
}

/// Re-crop the patch around its dominant peak.
///
/// Returns `None` when the patch is already centred well enough or the
/// usable crop would be too small to score.
pub(super) fn recenter_patch(patch: &ElevationPatch, radius_px: f32) -> Option<ElevationPatch> {
    let grid = &patch.elevation;
    if grid.w < MIN_RECROP_SIDE || grid.h < MIN_RECROP_SIDE {
        return None;
    }
    let (px, py) = dominant_peak(grid, radius_px);
    let (cx, cy) = grid.center();
    let offset = ((px as f32 - cx).powi(2) + (py as f32 - cy).powi(2)).sqrt();
    let short = grid.w.min(grid.h);
    if offset <= RECENTER_MIN_OFFSET * short as f32 {
        return None;
    }
    // Largest odd square that keeps the peak centred inside the raster.
    let margin = px
        .min(grid.w - 1 - px)
        .min(py)
        .min(grid.h - 1 - py)
        .min((short - 1) / 2);
    let side = 2 * margin + 1;
    if side < MIN_RECROP_SIDE {
        return None;
    }
    let cropped = grid.crop_square(px, py, side)?;
    debug!("StructureDetector: recentering on peak ({px}, {py}), crop side {side}");
    let mut out = patch.clone();
    out.elevation = cropped;
    out.patch_size_m = side as f32 * out.resolution_m;
    Some(out)
}

/// Profile clone with every valid feature's weight scaled by its module's
/// decisiveness. A fence-sitting module keeps half its weight; a fully
/// committed one keeps all of it.
pub(super) fn reweighted_profile(
    profile: &DetectorProfile,
    results: &BTreeMap<FeatureKind, FeatureResult>,
) -> DetectorProfile {
    let mut adjusted = profile.clone();
    for (kind, result) in results {
        if !result.valid {
            continue;
        }
        if let Some(settings) = adjusted.features.get_mut(kind) {
            settings.weight *= 0.5 + 0.5 * result.decisiveness();
        }
    }
    adjusted
}

/// Whether a refinement round's outcome replaces the current best: either it
/// escapes the ambiguous band outright or it clearly beats the best
/// confidence so far.
pub(super) fn round_improves(
    candidate: &AggregationResult,
    best: &AggregationResult,
    profile: &DetectorProfile,
) -> bool {
    !is_ambiguous(candidate, &profile.thresholds)
        || candidate.confidence > best.confidence + MIN_CONFIDENCE_GAIN
}
