//! Separable Gaussian smoothing and difference-of-Gaussians response.
//!
//! Taps are computed at runtime because the feature kernels scale σ with the
//! expected structure radius. Border handling uses clamping, matching the
//! gradient pass.

use super::grid::HeightGrid;

/// Normalised 1-D Gaussian taps for the given σ (radius = ceil(3σ), capped).
///
/// σ is floored at a small positive value so degenerate radii still produce a
/// valid kernel.
pub fn gaussian_taps(sigma: f32) -> Vec<f32> {
    let sigma = sigma.max(0.3);
    let radius = (sigma * 3.0).ceil() as usize;
    let radius = radius.clamp(1, 64);
    let denom = 2.0 * sigma * sigma;
    let mut taps = Vec::with_capacity(2 * radius + 1);
    let mut sum = 0.0f32;
    for i in 0..=2 * radius {
        let d = i as f32 - radius as f32;
        let v = (-d * d / denom).exp();
        taps.push(v);
        sum += v;
    }
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

fn convolve_rows(src: &HeightGrid, taps: &[f32]) -> HeightGrid {
    let w = src.w;
    let h = src.h;
    let radius = taps.len() / 2;
    let mut out = HeightGrid::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    for y in 0..h {
        let row = src.row(y);
        let out_row = out.row_mut(y);
        for (x, cell) in out_row.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &t) in taps.iter().enumerate() {
                let xi = (x + k).saturating_sub(radius).min(w - 1);
                acc += row[xi] * t;
            }
            *cell = acc;
        }
    }
    out
}

fn convolve_cols(src: &HeightGrid, taps: &[f32]) -> HeightGrid {
    let w = src.w;
    let h = src.h;
    let radius = taps.len() / 2;
    let mut out = HeightGrid::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    for y in 0..h {
        let out_row = out.row_mut(y);
        for (x, cell) in out_row.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &t) in taps.iter().enumerate() {
                let yi = (y + k).saturating_sub(radius).min(h - 1);
                acc += src.get(x, yi) * t;
            }
            *cell = acc;
        }
    }
    out
}

/// Separable Gaussian blur with border clamping.
pub fn gaussian_blur(src: &HeightGrid, sigma: f32) -> HeightGrid {
    let taps = gaussian_taps(sigma);
    convolve_cols(&convolve_rows(src, &taps), &taps)
}

/// Difference-of-Gaussians band-pass response: `blur(σ_inner) − blur(σ_outer)`.
///
/// With σ_inner < σ_outer the response peaks on blob boundaries whose scale
/// sits between the two σ values.
pub fn difference_of_gaussians(src: &HeightGrid, sigma_inner: f32, sigma_outer: f32) -> HeightGrid {
    let fine = gaussian_blur(src, sigma_inner);
    let coarse = gaussian_blur(src, sigma_outer);
    let mut out = fine;
    for (o, c) in out.data.iter_mut().zip(&coarse.data) {
        *o -= c;
    }
    out
}
