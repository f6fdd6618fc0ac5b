//! Boundary sharpness from difference-of-Gaussians band energy.
//!
//! A structure with an abrupt rim concentrates band-pass energy in an
//! annulus around the expected boundary. The score is the ratio of mean
//! absolute band response inside that annulus to the patch-wide mean,
//! squashed into [0, 1]; gradual natural slopes spread their energy and
//! score near the 0.5 midpoint, featureless ground scores zero.

use super::{FeatureModule, FeatureParams, FeatureResult, Polarity};
use crate::raster::filter::difference_of_gaussians;
use crate::raster::HeightGrid;

/// Boundary-sharpness scorer. Positive polarity: sharp rims only ever argue
/// for a structure.
pub struct DropoffModule {
    resolution_m: f32,
    radius_px: f32,
    sigma_inner_scale: f32,
    sigma_outer_scale: f32,
}

impl Default for DropoffModule {
    fn default() -> Self {
        Self {
            resolution_m: 1.0,
            radius_px: 8.0,
            sigma_inner_scale: 0.8,
            sigma_outer_scale: 1.2,
        }
    }
}

impl FeatureModule for DropoffModule {
    fn name(&self) -> &'static str {
        "dropoff"
    }

    fn set_geometry(&mut self, resolution_m: f32, structure_radius_px: f32) {
        self.resolution_m = resolution_m;
        self.radius_px = structure_radius_px;
    }

    fn configure(&mut self, params: &FeatureParams) -> Result<(), String> {
        for (key, value) in params {
            match key.as_str() {
                "sigma_inner_scale" => {
                    let v = value.as_num().ok_or_else(|| {
                        "dropoff: `sigma_inner_scale` must be a number".to_string()
                    })?;
                    if !(v.is_finite() && v > 0.0) {
                        return Err(format!("dropoff: `sigma_inner_scale` must be positive: {v}"));
                    }
                    self.sigma_inner_scale = v as f32;
                }
                "sigma_outer_scale" => {
                    let v = value.as_num().ok_or_else(|| {
                        "dropoff: `sigma_outer_scale` must be a number".to_string()
                    })?;
                    if !(v.is_finite() && v > 0.0) {
                        return Err(format!("dropoff: `sigma_outer_scale` must be positive: {v}"));
                    }
                    self.sigma_outer_scale = v as f32;
                }
                other => return Err(format!("dropoff: unknown parameter `{other}`")),
            }
        }
        if self.sigma_inner_scale >= self.sigma_outer_scale {
            return Err(format!(
                "dropoff: inner sigma scale {} must stay below outer {}",
                self.sigma_inner_scale, self.sigma_outer_scale
            ));
        }
        Ok(())
    }

    fn compute(&self, grid: &HeightGrid) -> FeatureResult {
        let short_side = grid.w.min(grid.h);
        if short_side < 8 {
            return FeatureResult::invalid(format!(
                "patch {}x{} too small for band filtering",
                grid.w, grid.h
            ));
        }
        let r_eff = self.radius_px.min(0.45 * short_side as f32);
        if r_eff < 2.0 {
            return FeatureResult::invalid("structure radius collapses below two cells");
        }

        let sigma_inner = (self.sigma_inner_scale * r_eff).max(0.6);
        let sigma_outer = (self.sigma_outer_scale * r_eff).max(sigma_inner + 0.2);
        let band = difference_of_gaussians(grid, sigma_inner, sigma_outer);

        let (cx, cy) = grid.center();
        let r_in = 0.8 * r_eff;
        let r_out = 1.2 * r_eff;
        let mut ring_sum = 0.0f64;
        let mut ring_n = 0u32;
        let mut all_sum = 0.0f64;
        for y in 0..grid.h {
            let dy = y as f32 - cy;
            for x in 0..grid.w {
                let e = band.data[band.idx(x, y)].abs() as f64;
                all_sum += e;
                let d = ((x as f32 - cx).powi(2) + dy * dy).sqrt();
                if d >= r_in && d <= r_out {
                    ring_sum += e;
                    ring_n += 1;
                }
            }
        }
        let all_mean = all_sum / (grid.w * grid.h) as f64;
        if ring_n == 0 {
            return FeatureResult::invalid("boundary annulus left the raster");
        }
        if all_mean < 1e-9 {
            return FeatureResult::scored(0.0, Polarity::Positive)
                .with_reason("no band energy anywhere")
                .with_metric("band_mean", 0.0)
                .with_metric("patch_mean", all_mean);
        }
        let ring_mean = ring_sum / ring_n as f64;
        let ratio = (ring_mean / all_mean) as f32;
        let score = ratio / (1.0 + ratio);

        FeatureResult::scored(score, Polarity::Positive)
            .with_metric("band_mean", ring_mean)
            .with_metric("patch_mean", all_mean)
            .with_metric("sigma_inner", sigma_inner as f64)
            .with_metric("sigma_outer", sigma_outer as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ParamValue;
    use crate::raster::HeightGrid;
    use crate::synthetic::flat_grid;

    /// Plateau with a hard rim at the given radius.
    fn plateau_grid(size: usize, radius_px: f32, height_m: f32) -> HeightGrid {
        let c = (size - 1) as f32 * 0.5;
        HeightGrid::from_fn(size, size, |x, y| {
            let d = ((x as f32 - c).powi(2) + (y as f32 - c).powi(2)).sqrt();
            if d <= radius_px {
                height_m
            } else {
                0.0
            }
        })
    }

    #[test]
    fn hard_rim_concentrates_band_energy() {
        let mut module = DropoffModule::default();
        module.set_geometry(1.0, 8.0);
        let out = module.compute(&plateau_grid(49, 8.0, 3.0));
        assert!(out.valid, "unexpected: {}", out.reason);
        assert!(out.score > 0.4, "plateau rim scored {}", out.score);
        assert_eq!(out.polarity, Polarity::Positive);
    }

    #[test]
    fn flat_ground_has_no_band_energy() {
        let mut module = DropoffModule::default();
        module.set_geometry(1.0, 8.0);
        let out = module.compute(&flat_grid(33, 12.0));
        assert!(out.valid);
        assert_eq!(out.score, 0.0);
    }

    #[test]
    fn inner_sigma_must_stay_below_outer() {
        let mut module = DropoffModule::default();
        let mut params = FeatureParams::new();
        params.insert("sigma_inner_scale".into(), ParamValue::Num(1.5));
        assert!(module.configure(&params).is_err());
    }
}
