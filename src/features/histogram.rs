//! Elevation-histogram similarity.
//!
//! Normalizes the patch to relative elevation, bins it into a fixed-width
//! histogram and compares that distribution against a reference shape with
//! cosine similarity. A gradient-concentration term and a radial-coherence
//! term sharpen the verdict: real structures put their slopes in a ring
//! around the center and lose height monotonically with distance from it.

use super::{FeatureModule, FeatureParams, FeatureResult, Polarity};
use crate::raster::stats::pearson;
use crate::raster::{sobel_gradients, HeightGrid};
use crate::synthetic::dome_grid;

const SIMILARITY_WEIGHT: f32 = 0.6;
const PATTERN_WEIGHT: f32 = 0.25;
const COHERENCE_WEIGHT: f32 = 0.15;

/// Histogram-similarity scorer. Neutral polarity: a patch can look like the
/// reference (supporting presence) or look nothing like it (against).
pub struct HistogramModule {
    resolution_m: f32,
    radius_px: f32,
    bins: usize,
    min_variation_m: f32,
    /// Reference bin weights, unit-sum. Regenerated from a synthetic dome on
    /// every geometry change unless a caller-supplied reference is pinned.
    reference: Vec<f32>,
    reference_supplied: bool,
}

impl Default for HistogramModule {
    fn default() -> Self {
        let mut m = Self {
            resolution_m: 1.0,
            radius_px: 8.0,
            bins: 16,
            min_variation_m: 0.3,
            reference: Vec::new(),
            reference_supplied: false,
        };
        m.rebuild_reference();
        m
    }
}

impl HistogramModule {
    fn rebuild_reference(&mut self) {
        if self.reference_supplied {
            return;
        }
        let side = ((self.radius_px * 2.0).ceil() as usize + 1).max(8);
        let dome = dome_grid(side, self.radius_px.max(2.0), 2.0);
        self.reference = bin_relative(&dome, self.bins).unwrap_or_else(|| vec![0.0; self.bins]);
    }
}

/// Bin a grid's relative elevations into `bins` unit-sum weights.
///
/// Returns `None` when the grid is degenerate (empty, non-finite or flat).
fn bin_relative(grid: &HeightGrid, bins: usize) -> Option<Vec<f32>> {
    let (lo, hi) = grid.min_max()?;
    let range = hi - lo;
    if !(range > 0.0) {
        return None;
    }
    let mut hist = vec![0.0f32; bins];
    for &z in &grid.data {
        let rel = ((z - lo) / range).clamp(0.0, 1.0);
        let b = ((rel * bins as f32) as usize).min(bins - 1);
        hist[b] += 1.0;
    }
    let total = grid.data.len() as f32;
    for w in &mut hist {
        *w /= total;
    }
    Some(hist)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (&x, &y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 1.0)
}

/// Fraction of gradient energy that sits in the slope ring around the patch
/// center, mapped so a uniform spread reads 0.5.
fn pattern_strength(grid: &HeightGrid, radius_px: f32) -> f32 {
    let grads = sobel_gradients(grid);
    let (cx, cy) = grid.center();
    let r_in = 0.5 * radius_px;
    let r_out = 1.5 * radius_px;
    let mut ring_sum = 0.0f64;
    let mut ring_n = 0u32;
    let mut all_sum = 0.0f64;
    for y in 0..grid.h {
        for x in 0..grid.w {
            let m = grads.mag.data[grid.idx(x, y)] as f64;
            all_sum += m;
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            if d >= r_in && d <= r_out {
                ring_sum += m;
                ring_n += 1;
            }
        }
    }
    let total = (grid.w * grid.h) as f64;
    if ring_n == 0 || all_sum <= 1e-9 {
        return 0.0;
    }
    let ring_mean = ring_sum / ring_n as f64;
    let all_mean = all_sum / total;
    let ratio = (ring_mean / all_mean) as f32;
    (0.5 * ratio).clamp(0.0, 1.0)
}

/// Anti-correlation of elevation with distance from center, clamped to [0, 1].
fn radial_coherence(grid: &HeightGrid) -> f32 {
    let (cx, cy) = grid.center();
    let mut dist = Vec::with_capacity(grid.w * grid.h);
    let mut height = Vec::with_capacity(grid.w * grid.h);
    for y in 0..grid.h {
        for x in 0..grid.w {
            dist.push(((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt());
            height.push(grid.data[grid.idx(x, y)]);
        }
    }
    match pearson(&dist, &height) {
        Some(r) => (-r).clamp(0.0, 1.0),
        None => 0.0,
    }
}

impl FeatureModule for HistogramModule {
    fn name(&self) -> &'static str {
        "histogram"
    }

    fn set_geometry(&mut self, resolution_m: f32, structure_radius_px: f32) {
        self.resolution_m = resolution_m;
        self.radius_px = structure_radius_px;
        self.rebuild_reference();
    }

    fn configure(&mut self, params: &FeatureParams) -> Result<(), String> {
        for (key, value) in params {
            match key.as_str() {
                "bins" => {
                    let v = value
                        .as_num()
                        .ok_or_else(|| "histogram: `bins` must be a number".to_string())?;
                    let bins = v as usize;
                    if !(16..=20).contains(&bins) {
                        return Err(format!("histogram: `bins` out of range 16..=20: {v}"));
                    }
                    self.bins = bins;
                }
                "min_variation_m" => {
                    let v = value
                        .as_num()
                        .ok_or_else(|| "histogram: `min_variation_m` must be a number".to_string())?;
                    if !(v.is_finite() && v > 0.0) {
                        return Err(format!("histogram: `min_variation_m` must be positive: {v}"));
                    }
                    self.min_variation_m = v as f32;
                }
                "reference" => {
                    let list = value
                        .as_list()
                        .ok_or_else(|| "histogram: `reference` must be a list of bin weights".to_string())?;
                    let sum: f64 = list.iter().sum();
                    if list.is_empty() || !(sum > 0.0) || list.iter().any(|v| *v < 0.0 || !v.is_finite()) {
                        return Err("histogram: `reference` must be non-empty, finite and non-negative".to_string());
                    }
                    self.reference = list.iter().map(|v| (*v / sum) as f32).collect();
                    self.reference_supplied = true;
                }
                other => return Err(format!("histogram: unknown parameter `{other}`")),
            }
        }
        if self.reference_supplied && self.reference.len() != self.bins {
            return Err(format!(
                "histogram: `reference` has {} bins but `bins` is {}",
                self.reference.len(),
                self.bins
            ));
        }
        self.rebuild_reference();
        Ok(())
    }

    fn compute(&self, grid: &HeightGrid) -> FeatureResult {
        if grid.w < 4 || grid.h < 4 {
            return FeatureResult::invalid(format!("patch {}x{} too small to bin", grid.w, grid.h));
        }
        let Some((lo, hi)) = grid.min_max() else {
            return FeatureResult::invalid("patch has no finite elevations");
        };
        let range = hi - lo;
        if range < self.min_variation_m {
            return FeatureResult::invalid(format!(
                "elevation range {range:.3} m below variation floor {:.3} m",
                self.min_variation_m
            ));
        }
        let Some(hist) = bin_relative(grid, self.bins) else {
            return FeatureResult::invalid("degenerate elevation distribution");
        };
        let similarity = cosine_similarity(&hist, &self.reference);
        let pattern = pattern_strength(grid, self.radius_px);
        let coherence = radial_coherence(grid);
        let score =
            SIMILARITY_WEIGHT * similarity + PATTERN_WEIGHT * pattern + COHERENCE_WEIGHT * coherence;
        FeatureResult::scored(score, Polarity::Neutral)
            .with_signature(score)
            .with_metric("similarity", similarity as f64)
            .with_metric("pattern_strength", pattern as f64)
            .with_metric("radial_coherence", coherence as f64)
            .with_metric("elevation_range_m", range as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ParamValue;
    use crate::synthetic::{dome_grid, flat_grid};

    #[test]
    fn dome_matches_the_default_reference() {
        let mut module = HistogramModule::default();
        module.set_geometry(1.0, 10.0);
        let grid = dome_grid(33, 10.0, 3.0);
        let out = module.compute(&grid);
        assert!(out.valid, "unexpected: {}", out.reason);
        assert!(out.score > 0.6, "dome scored {}", out.score);
        assert_eq!(out.polarity, Polarity::Neutral);
    }

    #[test]
    fn flat_patch_falls_below_the_variation_floor() {
        let module = HistogramModule::default();
        let grid = flat_grid(24, 100.0);
        let out = module.compute(&grid);
        assert!(!out.valid);
        assert_eq!(out.score, 0.0);
        assert!(out.reason.contains("variation floor"), "reason: {}", out.reason);
    }

    #[test]
    fn configure_rejects_unknown_keys_and_bad_bins() {
        let mut module = HistogramModule::default();
        let mut params = FeatureParams::new();
        params.insert("bogus".into(), ParamValue::Num(1.0));
        assert!(module.configure(&params).is_err());

        let mut params = FeatureParams::new();
        params.insert("bins".into(), ParamValue::Num(2.0));
        assert!(module.configure(&params).is_err());
    }

    #[test]
    fn supplied_reference_must_match_bin_count() {
        let mut module = HistogramModule::default();
        let mut params = FeatureParams::new();
        params.insert("bins".into(), ParamValue::Num(20.0));
        params.insert(
            "reference".into(),
            ParamValue::List(vec![1.0; 20]),
        );
        assert!(module.configure(&params).is_ok());

        let mut params = FeatureParams::new();
        params.insert(
            "reference".into(),
            ParamValue::List(vec![1.0; 5]),
        );
        assert!(module.configure(&params).is_err());
    }
}
