//! Volume and prominence above a local baseline.
//!
//! The baseline is the median of a border ring, which survives a structure
//! that fills most of the patch interior. Volume integrates positive height
//! above that baseline inside the central disc, scaled by cell area, and is
//! normalized against the half-dome volume of a nominal structure of the
//! configured radius. Prominence is the peak height above baseline; the
//! surrounding annulus spread additionally yields a relative prominence for
//! diagnostics.

use super::{FeatureModule, FeatureParams, FeatureResult, Polarity};
use crate::raster::mask::{annulus_values, border_ring_values, for_each_disc_cell};
use crate::raster::stats::{median, std_dev};
use crate::raster::HeightGrid;

const VOLUME_WEIGHT: f32 = 0.6;
const PROMINENCE_WEIGHT: f32 = 0.4;
const CONCENTRATION_BONUS: f32 = 0.1;

/// Volumetric scorer. Neutral polarity: a pronounced mound argues for a
/// structure, a hollow or featureless disc argues against one.
pub struct VolumeModule {
    resolution_m: f32,
    radius_px: f32,
    /// Peak height of the nominal structure the volume is normalized by.
    nominal_height_m: f32,
}

impl Default for VolumeModule {
    fn default() -> Self {
        Self {
            resolution_m: 1.0,
            radius_px: 8.0,
            nominal_height_m: 2.0,
        }
    }
}

impl FeatureModule for VolumeModule {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn set_geometry(&mut self, resolution_m: f32, structure_radius_px: f32) {
        self.resolution_m = resolution_m;
        self.radius_px = structure_radius_px;
    }

    fn configure(&mut self, params: &FeatureParams) -> Result<(), String> {
        for (key, value) in params {
            match key.as_str() {
                "nominal_height_m" => {
                    let v = value
                        .as_num()
                        .ok_or_else(|| "volume: `nominal_height_m` must be a number".to_string())?;
                    if !(v.is_finite() && v > 0.0) {
                        return Err(format!("volume: `nominal_height_m` must be positive: {v}"));
                    }
                    self.nominal_height_m = v as f32;
                }
                other => return Err(format!("volume: unknown parameter `{other}`")),
            }
        }
        Ok(())
    }

    fn compute(&self, grid: &HeightGrid) -> FeatureResult {
        let short_side = grid.w.min(grid.h);
        if short_side < 6 {
            return FeatureResult::invalid(format!(
                "patch {}x{} too small for a baseline ring",
                grid.w, grid.h
            ));
        }
        let (cx, cy) = grid.center();
        let r_eff = self.radius_px.min(0.45 * short_side as f32);
        if r_eff < 1.0 {
            return FeatureResult::invalid("structure radius collapses below one cell");
        }

        let ring_width = (short_side / 10).max(1);
        let mut ring = border_ring_values(grid, ring_width);
        let Some(baseline) = median(&mut ring) else {
            return FeatureResult::invalid("empty border ring");
        };

        let cell_area = (self.resolution_m * self.resolution_m) as f64;
        let mut volume = 0.0f64;
        let mut peak = f32::NEG_INFINITY;
        for_each_disc_cell(grid, cx, cy, r_eff, |_, _, z| {
            let d = z - baseline;
            if d > 0.0 {
                volume += d as f64 * cell_area;
            }
            peak = peak.max(z);
        });
        if !peak.is_finite() {
            return FeatureResult::invalid("central disc holds no cells");
        }
        let mut inner_volume = 0.0f64;
        for_each_disc_cell(grid, cx, cy, 0.5 * r_eff, |_, _, z| {
            let d = z - baseline;
            if d > 0.0 {
                inner_volume += d as f64 * cell_area;
            }
        });

        let prominence = (peak - baseline).max(0.0);
        let annulus = annulus_values(grid, cx, cy, 1.2 * r_eff, 2.0 * r_eff);
        let annulus_spread = std_dev(&annulus);
        let relative_prominence = if annulus_spread > 1e-6 {
            prominence / annulus_spread
        } else {
            0.0
        };

        // Half-dome volume of a nominal structure with this footprint.
        let radius_m = (r_eff * self.resolution_m) as f64;
        let reference_volume =
            0.5 * std::f64::consts::PI * radius_m * radius_m * self.nominal_height_m as f64;
        let norm_volume = ((volume / reference_volume) as f32).clamp(0.0, 1.0);
        let norm_prominence = (prominence / self.nominal_height_m).clamp(0.0, 1.0);

        let mut score = VOLUME_WEIGHT * norm_volume + PROMINENCE_WEIGHT * norm_prominence;
        let concentration = if volume > 1e-9 {
            (inner_volume / volume) as f32
        } else {
            0.0
        };
        if concentration >= 0.6 {
            score = (score + CONCENTRATION_BONUS).min(1.0);
        }

        FeatureResult::scored(score, Polarity::Neutral)
            .with_signature(score)
            .with_metric("volume_m3", volume)
            .with_metric("prominence_m", prominence as f64)
            .with_metric("relative_prominence", relative_prominence as f64)
            .with_metric("concentration", concentration as f64)
            .with_metric("baseline_m", baseline as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::MetaValue;
    use crate::synthetic::{dome_grid, flat_grid};

    #[test]
    fn dome_carries_volume_and_prominence() {
        let mut module = VolumeModule::default();
        module.set_geometry(1.0, 10.0);
        let grid = dome_grid(33, 10.0, 2.5);
        let out = module.compute(&grid);
        assert!(out.valid, "unexpected: {}", out.reason);
        assert!(out.score > 0.5, "dome scored {}", out.score);
        match out.metadata.get("prominence_m") {
            Some(MetaValue::Num(p)) => assert!((*p - 2.5).abs() < 0.1, "prominence {p}"),
            other => panic!("missing prominence metadata: {other:?}"),
        }
    }

    #[test]
    fn flat_patch_scores_zero_but_stays_valid() {
        let mut module = VolumeModule::default();
        module.set_geometry(1.0, 8.0);
        let out = module.compute(&flat_grid(25, 340.0));
        assert!(out.valid);
        assert!(out.score < 1e-6, "flat scored {}", out.score);
    }

    #[test]
    fn tiny_patch_is_rejected() {
        let module = VolumeModule::default();
        let out = module.compute(&flat_grid(4, 0.0));
        assert!(!out.valid);
    }
}
