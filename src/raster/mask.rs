//! Disc, annulus and border-ring cell selection over a raster.
//!
//! Radii are in cells and distances are measured centre-to-centre from a
//! fractional centre point. Iteration boxes are clamped to the raster, so a
//! region that pokes past the border simply yields fewer cells.

use super::grid::HeightGrid;

/// Visit every cell whose centre lies within `radius` of (cx, cy).
pub fn for_each_disc_cell(
    grid: &HeightGrid,
    cx: f32,
    cy: f32,
    radius: f32,
    mut f: impl FnMut(usize, usize, f32),
) {
    if grid.is_empty() || radius <= 0.0 {
        return;
    }
    let x0 = ((cx - radius).floor().max(0.0)) as usize;
    let y0 = ((cy - radius).floor().max(0.0)) as usize;
    let x1 = ((cx + radius).ceil() as usize).min(grid.w - 1);
    let y1 = ((cy + radius).ceil() as usize).min(grid.h - 1);
    let r2 = radius * radius;
    for y in y0..=y1 {
        let dy = y as f32 - cy;
        let row = grid.row(y);
        for (x, &v) in row.iter().enumerate().take(x1 + 1).skip(x0) {
            let dx = x as f32 - cx;
            if dx * dx + dy * dy <= r2 {
                f(x, y, v);
            }
        }
    }
}

/// Heights of all cells within `radius` of (cx, cy).
pub fn disc_values(grid: &HeightGrid, cx: f32, cy: f32, radius: f32) -> Vec<f32> {
    let mut out = Vec::new();
    for_each_disc_cell(grid, cx, cy, radius, |_, _, v| out.push(v));
    out
}

/// Heights of all cells whose distance from (cx, cy) lies in `[r_in, r_out]`.
pub fn annulus_values(grid: &HeightGrid, cx: f32, cy: f32, r_in: f32, r_out: f32) -> Vec<f32> {
    let mut out = Vec::new();
    if grid.is_empty() || r_out <= 0.0 || r_in > r_out {
        return out;
    }
    let x0 = ((cx - r_out).floor().max(0.0)) as usize;
    let y0 = ((cy - r_out).floor().max(0.0)) as usize;
    let x1 = ((cx + r_out).ceil() as usize).min(grid.w - 1);
    let y1 = ((cy + r_out).ceil() as usize).min(grid.h - 1);
    let r_in2 = r_in * r_in;
    let r_out2 = r_out * r_out;
    for y in y0..=y1 {
        let dy = y as f32 - cy;
        let row = grid.row(y);
        for (x, &v) in row.iter().enumerate().take(x1 + 1).skip(x0) {
            let dx = x as f32 - cx;
            let d2 = dx * dx + dy * dy;
            if d2 >= r_in2 && d2 <= r_out2 {
                out.push(v);
            }
        }
    }
    out
}

/// Heights of the outermost `width` cells of the raster frame.
pub fn border_ring_values(grid: &HeightGrid, width: usize) -> Vec<f32> {
    let mut out = Vec::new();
    if grid.is_empty() || width == 0 {
        return out;
    }
    let w = grid.w;
    let h = grid.h;
    let width = width.min(w.div_ceil(2)).min(h.div_ceil(2));
    for y in 0..h {
        let row = grid.row(y);
        if y < width || y >= h - width {
            out.extend_from_slice(row);
        } else {
            out.extend_from_slice(&row[..width]);
            out.extend_from_slice(&row[w - width..]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disc_count_approximates_circle_area() {
        let grid = HeightGrid::new(41, 41);
        let vals = disc_values(&grid, 20.0, 20.0, 10.0);
        let area = std::f32::consts::PI * 100.0;
        let n = vals.len() as f32;
        assert!((n - area).abs() < area * 0.05, "n={n} area={area}");
    }

    #[test]
    fn annulus_excludes_inner_disc() {
        let grid = HeightGrid::from_fn(21, 21, |x, y| {
            let dx = x as f32 - 10.0;
            let dy = y as f32 - 10.0;
            (dx * dx + dy * dy).sqrt()
        });
        let vals = annulus_values(&grid, 10.0, 10.0, 4.0, 7.0);
        assert!(!vals.is_empty());
        assert!(vals.iter().all(|&d| (4.0..=7.0).contains(&d)));
    }

    #[test]
    fn border_ring_covers_frame_only() {
        let grid = HeightGrid::from_fn(6, 5, |x, y| {
            let interior = x >= 1 && x < 5 && y >= 1 && y < 4;
            if interior {
                1.0
            } else {
                0.0
            }
        });
        let vals = border_ring_values(&grid, 1);
        assert_eq!(vals.len(), 6 * 5 - 4 * 3);
        assert!(vals.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn oversized_border_width_is_clamped() {
        let grid = HeightGrid::new(4, 4);
        let vals = border_ring_values(&grid, 10);
        assert_eq!(vals.len(), 16);
    }
}
