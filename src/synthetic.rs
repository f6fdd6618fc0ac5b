//! Deterministic synthetic elevation patches.
//!
//! Used by the demo binaries, by the histogram feature when no reference
//! distribution is configured, and by the test suite. All generators are
//! noise-free; tests add noise on top where they need it.

use crate::raster::{ElevationPatch, HeightGrid};

/// Radially symmetric raised-cosine dome: peak `height_m` at the centre,
/// monotonic falloff reaching the base at `radius_px`.
pub fn dome_grid(size: usize, radius_px: f32, height_m: f32) -> HeightGrid {
    let c = (size.saturating_sub(1)) as f32 * 0.5;
    let radius = radius_px.max(1.0);
    HeightGrid::from_fn(size, size, |x, y| {
        let dx = x as f32 - c;
        let dy = y as f32 - c;
        let r = (dx * dx + dy * dy).sqrt() / radius;
        if r >= 1.0 {
            0.0
        } else {
            height_m * 0.5 * (1.0 + (std::f32::consts::PI * r).cos())
        }
    })
}

/// Dome patch with the given ground sample distance.
pub fn dome_patch(size: usize, radius_px: f32, height_m: f32, resolution_m: f32) -> ElevationPatch {
    ElevationPatch::from_grid(dome_grid(size, radius_px, height_m), resolution_m)
        .with_source("synthetic:dome")
}

/// Featureless grid at a constant base elevation.
pub fn flat_grid(size: usize, base_m: f32) -> HeightGrid {
    HeightGrid::from_fn(size, size, |_, _| base_m)
}

/// Featureless patch at a constant base elevation.
pub fn flat_patch(size: usize, base_m: f32, resolution_m: f32) -> ElevationPatch {
    ElevationPatch::from_grid(flat_grid(size, base_m), resolution_m).with_source("synthetic:flat")
}

/// Linear ridge running top to bottom: elongated, not radially symmetric.
/// Useful as a negative case for symmetry-driven features.
pub fn ridge_grid(size: usize, height_m: f32) -> HeightGrid {
    let c = (size.saturating_sub(1)) as f32 * 0.5;
    let half_width = (size as f32 * 0.12).max(1.0);
    HeightGrid::from_fn(size, size, |x, _| {
        let d = (x as f32 - c).abs() / half_width;
        if d >= 1.0 {
            0.0
        } else {
            height_m * 0.5 * (1.0 + (std::f32::consts::PI * d).cos())
        }
    })
}

/// Ridge patch with the given ground sample distance.
pub fn ridge_patch(size: usize, height_m: f32, resolution_m: f32) -> ElevationPatch {
    ElevationPatch::from_grid(ridge_grid(size, height_m), resolution_m)
        .with_source("synthetic:ridge")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dome_peaks_at_centre_with_monotonic_falloff() {
        let grid = dome_grid(41, 15.0, 3.0);
        let c = 20usize;
        let peak = grid.get(c, c);
        assert!((peak - 3.0).abs() < 1e-5, "peak={peak}");
        let mut prev = peak;
        for r in 1..15 {
            let v = grid.get(c + r, c);
            assert!(v <= prev + 1e-6, "not monotonic at r={r}: {v} > {prev}");
            prev = v;
        }
        assert_eq!(grid.get(0, 0), 0.0);
    }

    #[test]
    fn ridge_is_elongated() {
        let patch = ridge_patch(33, 2.0, 1.0);
        let g = &patch.elevation;
        // Constant along the ridge axis, varying across it.
        assert!((g.get(16, 4) - g.get(16, 28)).abs() < 1e-6);
        assert!(g.get(16, 16) > g.get(4, 16));
    }
}
