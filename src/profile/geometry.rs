//! Physical geometry a profile expects of its structures and patches.

use serde::{Deserialize, Serialize};

/// Patch footprint the profile was tuned for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchShape {
    Square,
    Rectangle,
    Circle,
    Irregular,
}

/// Ground-truth geometry: sample distance, expected structure size, patch
/// extent. All lengths in metres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeometryParams {
    /// Ground sample distance of the raster (metres per cell).
    pub resolution_m: f32,
    /// Expected structure radius.
    pub structure_radius_m: f32,
    /// Smallest structure the profile should still flag.
    pub min_structure_size_m: f32,
    /// Largest structure the profile should still flag.
    pub max_structure_size_m: f32,
    pub patch_shape: PatchShape,
    /// Patch side length the profile was tuned for.
    pub patch_size_m: f32,
    /// Tolerated deviation of the patch aspect ratio from square.
    pub aspect_ratio_tolerance: f32,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            resolution_m: 1.0,
            structure_radius_m: 8.0,
            min_structure_size_m: 4.0,
            max_structure_size_m: 50.0,
            patch_shape: PatchShape::Square,
            patch_size_m: 40.0,
            aspect_ratio_tolerance: 0.3,
        }
    }
}

impl GeometryParams {
    /// Structure radius in raster cells.
    #[inline]
    pub fn radius_px(&self) -> f32 {
        self.structure_radius_m / self.resolution_m
    }

    pub(crate) fn validate(&self, issues: &mut Vec<String>) {
        if !(self.resolution_m.is_finite() && self.resolution_m > 0.0) {
            issues.push(format!(
                "geometry.resolution_m must be positive: {}",
                self.resolution_m
            ));
        }
        if !(self.structure_radius_m.is_finite() && self.structure_radius_m > 0.0) {
            issues.push(format!(
                "geometry.structure_radius_m must be positive: {}",
                self.structure_radius_m
            ));
        }
        if !(self.min_structure_size_m.is_finite() && self.min_structure_size_m > 0.0) {
            issues.push(format!(
                "geometry.min_structure_size_m must be positive: {}",
                self.min_structure_size_m
            ));
        }
        if self.min_structure_size_m >= self.max_structure_size_m {
            issues.push(format!(
                "geometry.min_structure_size_m {} must stay below max_structure_size_m {}",
                self.min_structure_size_m, self.max_structure_size_m
            ));
        }
        if !(self.patch_size_m.is_finite() && self.patch_size_m > 0.0) {
            issues.push(format!(
                "geometry.patch_size_m must be positive: {}",
                self.patch_size_m
            ));
        }
        if !(self.aspect_ratio_tolerance.is_finite() && self.aspect_ratio_tolerance >= 0.0) {
            issues.push(format!(
                "geometry.aspect_ratio_tolerance must be non-negative: {}",
                self.aspect_ratio_tolerance
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_is_clean() {
        let mut issues = Vec::new();
        GeometryParams::default().validate(&mut issues);
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn inverted_size_bounds_are_flagged() {
        let mut geometry = GeometryParams {
            min_structure_size_m: 60.0,
            ..GeometryParams::default()
        };
        let mut issues = Vec::new();
        geometry.validate(&mut issues);
        assert_eq!(issues.len(), 1, "{issues:?}");
        geometry.max_structure_size_m = 80.0;
        issues.clear();
        geometry.validate(&mut issues);
        assert!(issues.is_empty(), "{issues:?}");
    }
}
