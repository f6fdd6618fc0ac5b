//! Owned single-channel f32 elevation raster in row-major layout.
//!
//! Heights are metres above an arbitrary datum; the detection math only ever
//! consumes relative elevation, so the datum never matters. Serializes to and
//! from nested JSON arrays (rows of columns) with rectangularity enforced on
//! load.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Owned elevation raster of size `w × h` with `stride == w`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    /// Raster width in cells
    pub w: usize,
    /// Raster height in cells
    pub h: usize,
    /// Number of f32 elements between consecutive rows (equals `w`)
    pub stride: usize,
    /// Backing storage in row-major order
    pub data: Vec<f32>,
}

impl HeightGrid {
    /// Construct a zero-initialized raster of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![0.0; w * h],
        }
    }

    /// Construct a raster by evaluating `f(x, y)` for every cell.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut grid = Self::new(w, h);
        for y in 0..h {
            let row = grid.row_mut(y);
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = f(x, y);
            }
        }
        grid
    }

    /// Construct from row vectors, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, String> {
        let h = rows.len();
        let w = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(w * h);
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != w {
                return Err(format!(
                    "ragged elevation rows: row {} has {} cells, expected {w}",
                    y,
                    row.len()
                ));
            }
            data.extend_from_slice(&row);
        }
        Ok(Self { w, h, stride: w, data })
    }

    #[inline]
    /// Convert (x, y) to a linear index into `data`.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.stride + x
    }

    #[inline]
    /// Get the height at (x, y).
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.idx(x, y)]
    }

    #[inline]
    /// Set the height at (x, y).
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    #[inline]
    /// Borrow row `y` as a slice of `w` values.
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }

    #[inline]
    /// Borrow row `y` mutably.
    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.stride;
        let end = start + self.w;
        &mut self.data[start..end]
    }

    #[inline]
    /// True when the raster holds no cells.
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Cell-centre coordinates of the raster midpoint.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (
            (self.w.saturating_sub(1)) as f32 * 0.5,
            (self.h.saturating_sub(1)) as f32 * 0.5,
        )
    }

    /// Minimum and maximum height, or `None` for an empty raster.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut it = self.data.iter().copied();
        let first = it.next()?;
        let mut lo = first;
        let mut hi = first;
        for v in it {
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        Some((lo, hi))
    }

    /// True when every cell is finite (no NaN/inf left by the acquisition side).
    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Bilinear height sample at fractional coordinates, `None` outside the
    /// raster interior.
    pub fn bilinear(&self, x: f32, y: f32) -> Option<f32> {
        if self.w < 2 || self.h < 2 || !x.is_finite() || !y.is_finite() {
            return None;
        }
        if x < 0.0 || y < 0.0 || x > (self.w - 1) as f32 || y > (self.h - 1) as f32 {
            return None;
        }
        let x0 = (x.floor() as usize).min(self.w - 2);
        let y0 = (y.floor() as usize).min(self.h - 2);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let v00 = self.get(x0, y0);
        let v10 = self.get(x0 + 1, y0);
        let v01 = self.get(x0, y0 + 1);
        let v11 = self.get(x0 + 1, y0 + 1);
        let top = v00 + (v10 - v00) * fx;
        let bot = v01 + (v11 - v01) * fx;
        Some(top + (bot - top) * fy)
    }

    /// Copy a `side × side` window centred as close to (cx, cy) as the raster
    /// allows. Returns `None` when the window does not fit.
    pub fn crop_square(&self, cx: usize, cy: usize, side: usize) -> Option<HeightGrid> {
        if side == 0 || side > self.w || side > self.h {
            return None;
        }
        let half = side / 2;
        let x0 = cx.saturating_sub(half).min(self.w - side);
        let y0 = cy.saturating_sub(half).min(self.h - side);
        let mut out = HeightGrid::new(side, side);
        for y in 0..side {
            let src = &self.row(y0 + y)[x0..x0 + side];
            out.row_mut(y).copy_from_slice(src);
        }
        Some(out)
    }
}

impl Serialize for HeightGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq((0..self.h).map(|y| self.row(y)))
    }
}

impl<'de> Deserialize<'de> for HeightGrid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows: Vec<Vec<f32>> = Vec::deserialize(deserializer)?;
        HeightGrid::from_rows(rows).map_err(D::Error::custom)
    }
}
