use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use structure_detector::raster::{ElevationPatch, HeightGrid};
use structure_detector::synthetic::dome_patch;

/// Dome patch with seeded uniform noise in `[-noise_m, noise_m)` per cell.
pub fn noisy_dome_patch(
    size: usize,
    radius_px: f32,
    height_m: f32,
    resolution_m: f32,
    noise_m: f32,
    seed: u64,
) -> ElevationPatch {
    assert!(noise_m > 0.0, "noise amplitude must be positive");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut patch = dome_patch(size, radius_px, height_m, resolution_m);
    for y in 0..patch.elevation.h {
        for x in 0..patch.elevation.w {
            let v = patch.elevation.get(x, y) + rng.gen_range(-noise_m..noise_m);
            patch.elevation.set(x, y, v);
        }
    }
    patch.with_source("synthetic:noisy-dome")
}

/// Dome whose peak sits `(dx, dy)` cells away from the patch centre.
pub fn offset_dome_patch(
    size: usize,
    radius_px: f32,
    height_m: f32,
    resolution_m: f32,
    dx: f32,
    dy: f32,
) -> ElevationPatch {
    let c = (size.saturating_sub(1)) as f32 * 0.5;
    let (cx, cy) = (c + dx, c + dy);
    let radius = radius_px.max(1.0);
    let grid = HeightGrid::from_fn(size, size, |x, y| {
        let ddx = x as f32 - cx;
        let ddy = y as f32 - cy;
        let r = (ddx * ddx + ddy * ddy).sqrt() / radius;
        if r >= 1.0 {
            0.0
        } else {
            height_m * 0.5 * (1.0 + (std::f32::consts::PI * r).cos())
        }
    });
    ElevationPatch::from_grid(grid, resolution_m).with_source("synthetic:offset-dome")
}
