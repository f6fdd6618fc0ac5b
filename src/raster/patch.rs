//! One sampled elevation patch plus acquisition metadata.

use super::grid::HeightGrid;
use serde::{Deserialize, Serialize};

/// An elevation raster under evaluation, with provenance metadata.
///
/// The geographic centre and source label are provenance only; scoring math
/// never reads them. The grid is immutable for the duration of a detection
/// call and is shared read-only with worker threads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElevationPatch {
    /// Heights in metres, row-major.
    pub elevation: HeightGrid,
    /// Geographic centre latitude, if known.
    #[serde(default)]
    pub center_lat: Option<f64>,
    /// Geographic centre longitude, if known.
    #[serde(default)]
    pub center_lon: Option<f64>,
    /// Provenance label of the acquisition source.
    #[serde(default)]
    pub source: String,
    /// Ground sample distance in metres per cell.
    pub resolution_m: f32,
    /// Physical extent of the patch in metres.
    pub patch_size_m: f32,
}

impl ElevationPatch {
    /// Wrap a grid with the given ground sample distance; the physical extent
    /// is derived from the raster width.
    pub fn from_grid(elevation: HeightGrid, resolution_m: f32) -> Self {
        let patch_size_m = elevation.w as f32 * resolution_m;
        Self {
            elevation,
            center_lat: None,
            center_lon: None,
            source: String::new(),
            resolution_m,
            patch_size_m,
        }
    }

    /// Attach a provenance label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Attach a geographic centre.
    pub fn with_center(mut self, lat: f64, lon: f64) -> Self {
        self.center_lat = Some(lat);
        self.center_lon = Some(lon);
        self
    }

    /// Width / height of the raster in cells.
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.elevation.w, self.elevation.h)
    }

    /// True when the patch is usable by the detector: non-empty, finite
    /// heights, positive ground sample distance.
    pub fn is_well_formed(&self) -> bool {
        !self.elevation.is_empty()
            && self.resolution_m > 0.0
            && self.resolution_m.is_finite()
            && self.elevation.all_finite()
    }

    /// Width-to-height aspect ratio, `None` for an empty raster.
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.elevation.is_empty() {
            return None;
        }
        Some(self.elevation.w as f32 / self.elevation.h as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_grid_derives_extent() {
        let patch = ElevationPatch::from_grid(HeightGrid::new(40, 40), 0.5);
        assert!((patch.patch_size_m - 20.0).abs() < 1e-6);
        assert!(patch.is_well_formed());
    }

    #[test]
    fn non_finite_cells_flag_ill_formed() {
        let mut grid = HeightGrid::new(4, 4);
        grid.set(1, 2, f32::NAN);
        let patch = ElevationPatch::from_grid(grid, 1.0);
        assert!(!patch.is_well_formed());
    }
}
