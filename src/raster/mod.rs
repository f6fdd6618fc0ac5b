//! Elevation raster types and the numeric building blocks shared by the
//! feature kernels.
//!
//! - [`grid`] – owned row-major f32 raster with bilinear sampling.
//! - [`patch`] – one sampled patch plus acquisition metadata.
//! - [`stats`] – mean/variance/median/correlation helpers.
//! - [`gradient`] – Sobel gradients and Laplacian response.
//! - [`filter`] – runtime-σ Gaussian smoothing and difference of Gaussians.
//! - [`mask`] – disc / annulus / border-ring cell selection.
//! - [`io`] – patch and report JSON I/O.
//!
//! Design goals
//! - Favor clarity and cache-friendly row access over micro-optimizations.
//! - Handle borders by clamping indices (replicate).
//! - Keep outputs simple and serializable for tooling.

pub mod filter;
pub mod gradient;
pub mod grid;
pub mod io;
pub mod mask;
pub mod patch;
pub mod stats;

pub use gradient::{laplacian, sobel_gradients, GradientField};
pub use grid::HeightGrid;
pub use patch::ElevationPatch;
