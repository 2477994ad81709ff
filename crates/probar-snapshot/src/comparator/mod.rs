//! Comparator strategies.
//!
//! Both strategies consume two equal-sized buffers and report a difference
//! count plus a rendered diff image, so the threshold evaluator can treat
//! them uniformly.

mod pixel_diff;
mod ssim;

pub use pixel_diff::{PixelDiff, PixelDiffOptions};
pub use ssim::{diff_count_from_mssim, SsimMap, SsimOptions, StructuralSimilarity};

use crate::config::{warn_unknown_parameters, ComparisonAlgorithm, ComparisonConfig};
use crate::pixel_buffer::PixelBuffer;
use crate::result::SnapshotResult;

/// Output of a single comparator run
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Number of differing pixels (a derived proxy for SSIM)
    pub diff_pixel_count: u32,
    /// Rendered diff, same dimensions as the inputs
    pub diff_image: PixelBuffer,
    /// Mean structural similarity, when the comparator computes one
    pub mssim: Option<f64>,
}

/// A strategy that compares a captured image against a baseline
pub trait Comparator {
    /// Algorithm implemented by this comparator
    fn algorithm(&self) -> ComparisonAlgorithm;

    /// Compare `test` (captured) against `reference` (baseline)
    ///
    /// # Errors
    ///
    /// Returns [`crate::SnapshotError::DimensionMismatch`] when sizes differ
    fn compare(&self, test: &PixelBuffer, reference: &PixelBuffer) -> SnapshotResult<Comparison>;
}

/// Build the comparator selected by `config`, with its merged parameters
///
/// # Errors
///
/// Returns [`crate::SnapshotError::InvalidConfig`] for out-of-range parameters
pub fn comparator_for(config: &ComparisonConfig) -> SnapshotResult<Box<dyn Comparator>> {
    let params = config.resolved_parameters();
    warn_unknown_parameters(config.algorithm, &params);
    Ok(match config.algorithm {
        ComparisonAlgorithm::PixelDiff => {
            Box::new(PixelDiff::new(PixelDiffOptions::from_parameters(&params)?))
        }
        ComparisonAlgorithm::StructuralSimilarity => Box::new(StructuralSimilarity::new(
            SsimOptions::from_parameters(&params)?,
        )),
    })
}

/// Luminance of an RGB triple
pub(crate) fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}

/// Blend a channel value toward white by `alpha` (1.0 keeps it, 0.0 is white)
pub(crate) fn blend_white(c: f64, alpha: f64) -> f64 {
    255.0 + (c - 255.0) * alpha
}

/// Gray rendering of a test pixel faded toward white by `alpha * a / 255`
pub(crate) fn faded_gray(rgba: [u8; 4], alpha: f64) -> u8 {
    let [r, g, b, a] = rgba.map(f64::from);
    let y = rgb2y(r, g, b);
    blend_white(y, alpha * a / 255.0).floor().clamp(0.0, 255.0) as u8
}
