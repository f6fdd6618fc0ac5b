//! Surface regularity as inverted roughness.
//!
//! Chaotic terrain (vegetation, rubble, erosion gullies) spends its elevation
//! budget on fine-scale disorder; an engineered surface spends it on one
//! coherent large-scale shape. Three normalized disorder terms are blended
//! into an entropy value and inverted: spread of the height distribution,
//! spread of the slope field, and second-derivative roughness, every term
//! scaled against the patch's own relief so the measure is height-invariant.

use super::{FeatureModule, FeatureParams, FeatureResult, Polarity};
use crate::raster::stats::std_dev;
use crate::raster::{laplacian, sobel_gradients, HeightGrid};

const HEIGHT_TERM_WEIGHT: f32 = 0.30;
const SLOPE_TERM_WEIGHT: f32 = 0.35;
const ROUGHNESS_TERM_WEIGHT: f32 = 0.35;

/// Regularity scorer. Positive polarity.
pub struct EntropyModule {
    resolution_m: f32,
    radius_px: f32,
    min_range_m: f32,
}

impl Default for EntropyModule {
    fn default() -> Self {
        Self {
            resolution_m: 1.0,
            radius_px: 8.0,
            min_range_m: 0.15,
        }
    }
}

impl FeatureModule for EntropyModule {
    fn name(&self) -> &'static str {
        "entropy"
    }

    fn set_geometry(&mut self, resolution_m: f32, structure_radius_px: f32) {
        self.resolution_m = resolution_m;
        self.radius_px = structure_radius_px;
    }

    fn configure(&mut self, params: &FeatureParams) -> Result<(), String> {
        for (key, value) in params {
            match key.as_str() {
                "min_range_m" => {
                    let v = value
                        .as_num()
                        .ok_or_else(|| "entropy: `min_range_m` must be a number".to_string())?;
                    if !(v.is_finite() && v >= 0.0) {
                        return Err(format!("entropy: `min_range_m` must be non-negative: {v}"));
                    }
                    self.min_range_m = v as f32;
                }
                other => return Err(format!("entropy: unknown parameter `{other}`")),
            }
        }
        Ok(())
    }

    fn compute(&self, grid: &HeightGrid) -> FeatureResult {
        let short_side = grid.w.min(grid.h);
        if short_side < 6 {
            return FeatureResult::invalid(format!(
                "patch {}x{} too small for roughness analysis",
                grid.w, grid.h
            ));
        }
        let Some((lo, hi)) = grid.min_max() else {
            return FeatureResult::invalid("patch has no finite elevations");
        };
        let range = hi - lo;
        if range < self.min_range_m {
            return FeatureResult::scored(0.0, Polarity::Positive)
                .with_reason(format!(
                    "elevation range {range:.3} m below relief floor {:.3} m",
                    self.min_range_m
                ))
                .with_metric("elevation_range_m", range as f64);
        }

        // One coherent shape per patch puts its slope budget at a single
        // scale; the unit below is that nominal slope (range over half the
        // short side, in height per cell).
        let slope_unit = 2.0 * range / short_side as f32;

        let height_spread = (2.0 * std_dev(&grid.data) / range).clamp(0.0, 1.0);

        let grads = sobel_gradients(grid);
        // Sobel kernels sum to 8x the central difference.
        let slopes: Vec<f32> = grads.mag.data.iter().map(|m| m / 8.0).collect();
        let slope_ratio = std_dev(&slopes) / (slope_unit + 1e-6);
        let slope_spread = slope_ratio / (1.0 + slope_ratio);

        let lap = laplacian(grid);
        // 4-neighbour Laplacian carries a factor of 4 over the pointwise
        // second difference.
        let curvature = lap.data.iter().map(|v| v.abs()).sum::<f32>() / (4.0 * lap.data.len() as f32);
        let roughness_ratio = curvature / (slope_unit + 1e-6);
        let roughness = roughness_ratio / (1.0 + roughness_ratio);

        let entropy = (HEIGHT_TERM_WEIGHT * height_spread
            + SLOPE_TERM_WEIGHT * slope_spread
            + ROUGHNESS_TERM_WEIGHT * roughness)
            .clamp(0.0, 1.0);

        FeatureResult::scored(1.0 - entropy, Polarity::Positive)
            .with_metric("entropy", entropy as f64)
            .with_metric("height_spread", height_spread as f64)
            .with_metric("slope_spread", slope_spread as f64)
            .with_metric("roughness", roughness as f64)
            .with_metric("elevation_range_m", range as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{dome_grid, flat_grid};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn flat_patch_scores_zero_under_the_relief_floor() {
        let module = EntropyModule::default();
        let out = module.compute(&flat_grid(25, 10.0));
        assert!(out.valid);
        assert_eq!(out.score, 0.0);
        assert!(out.reason.contains("relief floor"), "reason: {}", out.reason);
    }

    #[test]
    fn smooth_dome_is_more_regular_than_noise() {
        let module = EntropyModule::default();
        let dome = module.compute(&dome_grid(33, 12.0, 2.5));
        assert!(dome.valid);

        let mut rng = StdRng::seed_from_u64(7);
        let noisy = HeightGrid::from_fn(33, 33, |_, _| rng.gen_range(-1.25..1.25));
        let rough = module.compute(&noisy);
        assert!(rough.valid);
        assert!(
            dome.score > rough.score + 0.15,
            "dome {} vs noise {}",
            dome.score,
            rough.score
        );
    }
}
