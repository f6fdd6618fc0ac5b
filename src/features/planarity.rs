//! Least-squares plane fit over the central disc.
//!
//! Solves the 3x3 normal equations for z = a*dx + b*dy + c with coordinates
//! centred on the disc, then scores how tightly the surface hugs that plane.
//! Levelled platforms and paved surfaces fit within centimetres; rubble and
//! vegetation leave large residuals. A steep fitted plane is discounted, a
//! hillside is planar without being anyone's floor.

use super::{FeatureModule, FeatureParams, FeatureResult, Polarity};
use crate::raster::mask::for_each_disc_cell;
use crate::raster::HeightGrid;
use nalgebra::{Matrix3, Vector3};

const MIN_SAMPLES: usize = 8;
const STEEP_SLOPE_PENALTY: f32 = 0.7;

/// Plane-fit scorer. Neutral polarity: planarity reads as support only when
/// the surface is decisively flat, and as opposition when it is decisively
/// not.
pub struct PlanarityModule {
    resolution_m: f32,
    radius_px: f32,
    residual_tolerance_m: f32,
    max_slope: f32,
    min_range_m: f32,
}

impl Default for PlanarityModule {
    fn default() -> Self {
        Self {
            resolution_m: 1.0,
            radius_px: 8.0,
            residual_tolerance_m: 0.15,
            max_slope: 0.25,
            min_range_m: 0.15,
        }
    }
}

impl FeatureModule for PlanarityModule {
    fn name(&self) -> &'static str {
        "planarity"
    }

    fn set_geometry(&mut self, resolution_m: f32, structure_radius_px: f32) {
        self.resolution_m = resolution_m;
        self.radius_px = structure_radius_px;
    }

    fn configure(&mut self, params: &FeatureParams) -> Result<(), String> {
        for (key, value) in params {
            match key.as_str() {
                "residual_tolerance_m" => {
                    let v = value.as_num().ok_or_else(|| {
                        "planarity: `residual_tolerance_m` must be a number".to_string()
                    })?;
                    if !(v.is_finite() && v > 0.0) {
                        return Err(format!(
                            "planarity: `residual_tolerance_m` must be positive: {v}"
                        ));
                    }
                    self.residual_tolerance_m = v as f32;
                }
                "max_slope" => {
                    let v = value
                        .as_num()
                        .ok_or_else(|| "planarity: `max_slope` must be a number".to_string())?;
                    if !(v.is_finite() && v > 0.0) {
                        return Err(format!("planarity: `max_slope` must be positive: {v}"));
                    }
                    self.max_slope = v as f32;
                }
                "min_range_m" => {
                    let v = value
                        .as_num()
                        .ok_or_else(|| "planarity: `min_range_m` must be a number".to_string())?;
                    if !(v.is_finite() && v >= 0.0) {
                        return Err(format!("planarity: `min_range_m` must be non-negative: {v}"));
                    }
                    self.min_range_m = v as f32;
                }
                other => return Err(format!("planarity: unknown parameter `{other}`")),
            }
        }
        Ok(())
    }

    fn compute(&self, grid: &HeightGrid) -> FeatureResult {
        let short_side = grid.w.min(grid.h);
        let r_eff = self.radius_px.min(0.45 * short_side as f32);
        let (cx, cy) = grid.center();

        let mut samples: Vec<(f32, f32, f32)> = Vec::new();
        for_each_disc_cell(grid, cx, cy, r_eff, |x, y, z| {
            samples.push((x as f32 - cx, y as f32 - cy, z));
        });
        if samples.len() < MIN_SAMPLES {
            return FeatureResult::invalid(format!(
                "{} disc samples, need at least {MIN_SAMPLES}",
                samples.len()
            ));
        }

        let mut z_lo = f32::INFINITY;
        let mut z_hi = f32::NEG_INFINITY;
        for &(_, _, z) in &samples {
            z_lo = z_lo.min(z);
            z_hi = z_hi.max(z);
        }
        if z_hi - z_lo < self.min_range_m {
            // Trivially planar: pin to the fence so the evidence stays out of
            // the ensemble under the default admission gate.
            return FeatureResult::scored(0.5, Polarity::Neutral)
                .with_signature(0.5)
                .with_reason(format!(
                    "relief {:.3} m below floor {:.3} m, fit is trivial",
                    z_hi - z_lo,
                    self.min_range_m
                ));
        }

        let (mut sxx, mut sxy, mut syy) = (0.0f64, 0.0f64, 0.0f64);
        let (mut sx, mut sy, mut sz) = (0.0f64, 0.0f64, 0.0f64);
        let (mut sxz, mut syz) = (0.0f64, 0.0f64);
        for &(dx, dy, z) in &samples {
            let (dx, dy, z) = (dx as f64, dy as f64, z as f64);
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
            sx += dx;
            sy += dy;
            sz += z;
            sxz += dx * z;
            syz += dy * z;
        }
        let n = samples.len() as f64;
        let normal = Matrix3::new(sxx, sxy, sx, sxy, syy, sy, sx, sy, n);
        let rhs = Vector3::new(sxz, syz, sz);
        let Some(coeffs) = normal.lu().solve(&rhs) else {
            return FeatureResult::invalid("singular plane fit");
        };
        let (a, b, c) = (coeffs[0], coeffs[1], coeffs[2]);

        let mut sq_sum = 0.0f64;
        for &(dx, dy, z) in &samples {
            let pred = a * dx as f64 + b * dy as f64 + c;
            let r = z as f64 - pred;
            sq_sum += r * r;
        }
        let rms = (sq_sum / n).sqrt() as f32;
        let mut score = 1.0 / (1.0 + rms / self.residual_tolerance_m);

        // a, b are height change per cell; divide by cell size for rise/run.
        let slope = ((a * a + b * b).sqrt() as f32) / self.resolution_m;
        if slope > self.max_slope {
            score *= STEEP_SLOPE_PENALTY;
        }

        FeatureResult::scored(score, Polarity::Neutral)
            .with_signature(score)
            .with_metric("residual_rms_m", rms as f64)
            .with_metric("slope", slope as f64)
            .with_metric("samples", samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::dome_grid;

    #[test]
    fn tilted_plane_fits_exactly() {
        let mut module = PlanarityModule::default();
        module.set_geometry(1.0, 8.0);
        let grid = HeightGrid::from_fn(25, 25, |x, y| 5.0 + 0.1 * x as f32 + 0.05 * y as f32);
        let out = module.compute(&grid);
        assert!(out.valid, "unexpected: {}", out.reason);
        assert!(out.score > 0.9, "plane scored {}", out.score);
    }

    #[test]
    fn dome_leaves_large_residuals() {
        let mut module = PlanarityModule::default();
        module.set_geometry(1.0, 10.0);
        let out = module.compute(&dome_grid(33, 10.0, 2.5));
        assert!(out.valid);
        assert!(out.score < 0.5, "dome scored {}", out.score);
    }

    #[test]
    fn steep_plane_is_discounted() {
        let mut module = PlanarityModule::default();
        module.set_geometry(1.0, 8.0);
        let gentle = module.compute(&HeightGrid::from_fn(25, 25, |x, y| {
            2.0 + 0.05 * x as f32 + 0.02 * y as f32
        }));
        let steep = module.compute(&HeightGrid::from_fn(25, 25, |x, y| {
            2.0 + 0.5 * x as f32 + 0.3 * y as f32
        }));
        assert!(steep.score < gentle.score);
    }

    #[test]
    fn tiny_disc_is_rejected() {
        let mut module = PlanarityModule::default();
        module.set_geometry(1.0, 0.5);
        let out = module.compute(&dome_grid(9, 3.0, 1.0));
        assert!(!out.valid);
    }
}
