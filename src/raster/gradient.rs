//! Height-field gradients (Sobel) and Laplacian response.
//!
//! - Convolves the 3×3 Sobel kernel pair with border clamping.
//! - Outputs per-cell `gx`, `gy`, `mag = sqrt(gx^2 + gy^2)` in height units
//!   per cell; divide by the ground sample distance for physical slope.
//!
//! Complexity: O(W·H) per pass; memory: three float buffers.

use super::grid::HeightGrid;

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Per-cell gradient buffers for one elevation raster.
#[derive(Clone, Debug)]
pub struct GradientField {
    /// Horizontal derivative (convolution with kernel X)
    pub gx: HeightGrid,
    /// Vertical derivative (convolution with kernel Y)
    pub gy: HeightGrid,
    /// Euclidean magnitude per cell: `sqrt(gx^2 + gy^2)`
    pub mag: HeightGrid,
}

/// Compute Sobel gradients of an elevation raster.
pub fn sobel_gradients(grid: &HeightGrid) -> GradientField {
    let w = grid.w;
    let h = grid.h;
    let mut gx = HeightGrid::new(w, h);
    let mut gy = HeightGrid::new(w, h);
    let mut mag = HeightGrid::new(w, h);

    if w == 0 || h == 0 {
        return GradientField { gx, gy, mag };
    }

    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let rows = [grid.row(y_idx[0]), grid.row(y_idx[1]), grid.row(y_idx[2])];
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];

            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for (ky, row) in rows.iter().enumerate() {
                let kx_row = &SOBEL_KERNEL_X[ky];
                let ky_row = &SOBEL_KERNEL_Y[ky];
                sum_x += row[x_idx[0]] * kx_row[0]
                    + row[x_idx[1]] * kx_row[1]
                    + row[x_idx[2]] * kx_row[2];
                sum_y += row[x_idx[0]] * ky_row[0]
                    + row[x_idx[1]] * ky_row[1]
                    + row[x_idx[2]] * ky_row[2];
            }

            gx.set(x, y, sum_x);
            gy.set(x, y, sum_y);
            mag.set(x, y, (sum_x * sum_x + sum_y * sum_y).sqrt());
        }
    }

    GradientField { gx, gy, mag }
}

/// 4-neighbour Laplacian response, border-clamped.
///
/// High absolute response marks rough, rapidly curving terrain; near-zero
/// response marks planar or gently curved surfaces.
pub fn laplacian(grid: &HeightGrid) -> HeightGrid {
    let w = grid.w;
    let h = grid.h;
    let mut out = HeightGrid::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    for y in 0..h {
        let up = grid.row(y.saturating_sub(1));
        let row = grid.row(y);
        let down = grid.row((y + 1).min(h - 1));
        let out_row = out.row_mut(y);
        for (x, cell) in out_row.iter_mut().enumerate() {
            let left = row[x.saturating_sub(1)];
            let right = row[(x + 1).min(w - 1)];
            *cell = up[x] + down[x] + left + right - 4.0 * row[x];
        }
    }
    out
}
