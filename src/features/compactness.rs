//! Radial symmetry from an angular ring sample.
//!
//! Samples the elevation bilinearly at N equally spaced angles on the ring at
//! the structure radius. A compact, roughly circular structure keeps the ring
//! at a near-constant height, so the angular spread relative to the patch
//! spread is the signal. Outlier-heavy rings (vegetation spikes, partial
//! occlusion) take a penalty, and a patch whose centre does not rise above
//! the ring at all has no symmetry to speak of.

use super::{FeatureModule, FeatureParams, FeatureResult, Polarity};
use crate::raster::mask::disc_values;
use crate::raster::stats::{mean, std_dev};
use crate::raster::HeightGrid;

const OUTLIER_PENALTY: f32 = 0.6;

/// Ring-symmetry scorer. Positive polarity.
pub struct CompactnessModule {
    resolution_m: f32,
    radius_px: f32,
    samples: usize,
    outlier_sigma: f32,
    outlier_fraction_limit: f32,
    min_relief_m: f32,
}

impl Default for CompactnessModule {
    fn default() -> Self {
        Self {
            resolution_m: 1.0,
            radius_px: 8.0,
            samples: 16,
            outlier_sigma: 2.0,
            outlier_fraction_limit: 0.25,
            min_relief_m: 0.2,
        }
    }
}

impl FeatureModule for CompactnessModule {
    fn name(&self) -> &'static str {
        "compactness"
    }

    fn set_geometry(&mut self, resolution_m: f32, structure_radius_px: f32) {
        self.resolution_m = resolution_m;
        self.radius_px = structure_radius_px;
    }

    fn configure(&mut self, params: &FeatureParams) -> Result<(), String> {
        for (key, value) in params {
            match key.as_str() {
                "samples" => {
                    let v = value
                        .as_num()
                        .ok_or_else(|| "compactness: `samples` must be a number".to_string())?;
                    let n = v as usize;
                    if !(8..=256).contains(&n) {
                        return Err(format!("compactness: `samples` out of range 8..=256: {v}"));
                    }
                    self.samples = n;
                }
                "outlier_sigma" => {
                    let v = value
                        .as_num()
                        .ok_or_else(|| "compactness: `outlier_sigma` must be a number".to_string())?;
                    if !(v.is_finite() && v > 0.0) {
                        return Err(format!("compactness: `outlier_sigma` must be positive: {v}"));
                    }
                    self.outlier_sigma = v as f32;
                }
                "outlier_fraction_limit" => {
                    let v = value.as_num().ok_or_else(|| {
                        "compactness: `outlier_fraction_limit` must be a number".to_string()
                    })?;
                    if !(0.0..=1.0).contains(&v) {
                        return Err(format!(
                            "compactness: `outlier_fraction_limit` must lie in [0, 1]: {v}"
                        ));
                    }
                    self.outlier_fraction_limit = v as f32;
                }
                "min_relief_m" => {
                    let v = value
                        .as_num()
                        .ok_or_else(|| "compactness: `min_relief_m` must be a number".to_string())?;
                    if !(v.is_finite() && v >= 0.0) {
                        return Err(format!(
                            "compactness: `min_relief_m` must be non-negative: {v}"
                        ));
                    }
                    self.min_relief_m = v as f32;
                }
                other => return Err(format!("compactness: unknown parameter `{other}`")),
            }
        }
        Ok(())
    }

    fn compute(&self, grid: &HeightGrid) -> FeatureResult {
        let short_side = grid.w.min(grid.h);
        if short_side < 6 {
            return FeatureResult::invalid(format!(
                "patch {}x{} too small for ring sampling",
                grid.w, grid.h
            ));
        }
        let r_eff = self.radius_px.min(0.45 * short_side as f32);
        if r_eff < 2.0 {
            return FeatureResult::invalid("ring radius collapses below two cells");
        }
        let (cx, cy) = grid.center();

        let mut ring = Vec::with_capacity(self.samples);
        let mut misses = 0usize;
        for k in 0..self.samples {
            let theta = std::f32::consts::TAU * k as f32 / self.samples as f32;
            let x = cx + r_eff * theta.cos();
            let y = cy + r_eff * theta.sin();
            match grid.bilinear(x, y) {
                Some(v) => ring.push(v),
                None => misses += 1,
            }
        }
        if misses * 4 > self.samples {
            return FeatureResult::invalid(format!(
                "ring leaves the raster ({misses}/{} samples out of bounds)",
                self.samples
            ));
        }

        let ring_mean = mean(&ring);
        let ring_std = std_dev(&ring);
        let centre = disc_values(grid, cx, cy, (0.25 * r_eff).max(1.0));
        let relief = mean(&centre) - ring_mean;
        if relief < self.min_relief_m {
            return FeatureResult::scored(0.0, Polarity::Positive)
                .with_reason(format!(
                    "no central relief ({relief:.3} m above ring, floor {:.3} m)",
                    self.min_relief_m
                ))
                .with_metric("relief_m", relief as f64);
        }

        let patch_std = std_dev(&grid.data);
        let normalized_variation = ring_std / (patch_std + 1e-6);
        let mut score = 1.0 / (1.0 + 3.0 * normalized_variation);

        let outliers = if ring_std > 1e-6 {
            ring.iter()
                .filter(|v| (**v - ring_mean).abs() > self.outlier_sigma * ring_std)
                .count()
        } else {
            0
        };
        let outlier_fraction = outliers as f32 / ring.len() as f32;
        if outlier_fraction > self.outlier_fraction_limit {
            score *= OUTLIER_PENALTY;
        }

        FeatureResult::scored(score, Polarity::Positive)
            .with_metric("ring_mean_m", ring_mean as f64)
            .with_metric("ring_std_m", ring_std as f64)
            .with_metric("normalized_variation", normalized_variation as f64)
            .with_metric("outlier_fraction", outlier_fraction as f64)
            .with_metric("relief_m", relief as f64)
    }
}
