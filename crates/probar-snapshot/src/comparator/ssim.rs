//! Structural similarity comparator.
//!
//! Computes the Wang et al. SSIM map over a normalized Gaussian window with
//! "valid" convolution, then reports `round((1 - mssim) * width * height)`
//! as the difference count. The count is a continuous proxy, not a tally of
//! differing pixels; it lets SSIM share the threshold evaluator with the
//! pixel comparator.

use super::{faded_gray, Comparator, Comparison};
use crate::config::{parameter_in_range, ComparisonAlgorithm};
use crate::pixel_buffer::PixelBuffer;
use crate::result::SnapshotResult;
use std::collections::BTreeMap;

/// Fade applied to test pixels that replace transparent diff pixels
const TRANSPARENT_BLEND: f64 = 0.2;

/// Images whose shorter side exceeds this are downsampled first
const DOWNSAMPLE_TARGET: f64 = 256.0;

/// Tuning for [`StructuralSimilarity`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsimOptions {
    /// Side of the square Gaussian window
    pub window_size: usize,
    /// Standard deviation of the Gaussian window
    pub sigma: f64,
    /// Luminance stabilizer
    pub k1: f64,
    /// Contrast stabilizer
    pub k2: f64,
    /// Bits per sample; the dynamic range is `2^bit_depth - 1`
    pub bit_depth: u32,
    /// Shrink large images by `round(min(w, h) / 256)` before comparing
    pub downsample: bool,
}

impl Default for SsimOptions {
    fn default() -> Self {
        Self {
            window_size: 11,
            sigma: 1.5,
            k1: 0.01,
            k2: 0.03,
            bit_depth: 8,
            downsample: true,
        }
    }
}

impl SsimOptions {
    /// Read options from a merged parameter map
    ///
    /// # Errors
    ///
    /// Returns error for a zero window, non-positive sigma, negative
    /// stabilizers or a bit depth outside 1..=16
    pub fn from_parameters(params: &BTreeMap<String, f64>) -> SnapshotResult<Self> {
        let window_size = parameter_in_range(params, "window_size", 1.0, 255.0)?;
        let sigma = parameter_in_range(params, "sigma", f64::MIN_POSITIVE, 1e3)?;
        let bit_depth = parameter_in_range(params, "bit_depth", 1.0, 16.0)?;
        Ok(Self {
            window_size: window_size.round() as usize,
            sigma,
            k1: parameter_in_range(params, "k1", 0.0, 1.0)?,
            k2: parameter_in_range(params, "k2", 0.0, 1.0)?,
            bit_depth: bit_depth.round() as u32,
            downsample: params.get("downsample").is_some_and(|v| *v != 0.0),
        })
    }
}

/// SSIM map and its mean
#[derive(Debug, Clone, PartialEq)]
pub struct SsimMap {
    /// Map width (image width minus window plus one, after downsampling)
    pub width: usize,
    /// Map height
    pub height: usize,
    /// Row-major similarity values
    pub data: Vec<f64>,
    /// Mean similarity, clamped to `[0, 1]`
    pub mssim: f64,
}

impl SsimMap {
    /// Similarity sample nearest to image pixel `(x, y)`
    fn sample(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        let row = (self.height as f64 * f64::from(y) / f64::from(height)).round() as usize;
        let col = (self.width as f64 * f64::from(x) / f64::from(width)).round() as usize;
        let row = row.min(self.height - 1);
        let col = col.min(self.width - 1);
        self.data[row * self.width + col]
    }
}

/// Structural similarity comparator
#[derive(Debug, Clone, Default)]
pub struct StructuralSimilarity {
    options: SsimOptions,
}

impl StructuralSimilarity {
    /// Create a comparator with the given options
    #[must_use]
    pub const fn new(options: SsimOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &SsimOptions {
        &self.options
    }

    /// Compute the SSIM map of two equal-sized buffers
    ///
    /// # Errors
    ///
    /// Returns [`crate::SnapshotError::DimensionMismatch`] when sizes differ
    pub fn ssim_map(&self, test: &PixelBuffer, reference: &PixelBuffer) -> SnapshotResult<SsimMap> {
        reference.ensure_same_dimensions(test)?;
        let (width, height) = test.dimensions();
        if width == 0 || height == 0 {
            return Ok(SsimMap {
                width: 1,
                height: 1,
                data: vec![1.0],
                mssim: 1.0,
            });
        }

        let mut a = Plane::luma(test);
        let mut b = Plane::luma(reference);
        if self.options.downsample {
            let factor = (f64::from(width.min(height)) / DOWNSAMPLE_TARGET).round() as usize;
            if factor > 1 {
                a = a.downsample(factor);
                b = b.downsample(factor);
            }
        }

        let window_size = self.options.window_size.min(a.width).min(a.height).max(1);
        let kernel = gaussian_kernel(window_size, self.options.sigma);
        let range = f64::from((1u32 << self.options.bit_depth) - 1);
        let c1 = (self.options.k1 * range).powi(2);
        let c2 = (self.options.k2 * range).powi(2);

        let mu1 = a.filter_valid(&kernel);
        let mu2 = b.filter_valid(&kernel);
        let a2 = a.product(&a).filter_valid(&kernel);
        let b2 = b.product(&b).filter_valid(&kernel);
        let ab = a.product(&b).filter_valid(&kernel);

        let data: Vec<f64> = (0..mu1.data.len())
            .map(|i| {
                let (m1, m2) = (mu1.data[i], mu2.data[i]);
                let sigma1 = a2.data[i] - m1 * m1;
                let sigma2 = b2.data[i] - m2 * m2;
                let sigma12 = ab.data[i] - m1 * m2;
                ((2.0 * m1 * m2 + c1) * (2.0 * sigma12 + c2))
                    / ((m1 * m1 + m2 * m2 + c1) * (sigma1 + sigma2 + c2))
            })
            .collect();

        let mean = data.iter().sum::<f64>() / data.len() as f64;
        let mssim = if mean.is_finite() {
            mean.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(SsimMap {
            width: mu1.width,
            height: mu1.height,
            data,
            mssim,
        })
    }
}

impl Comparator for StructuralSimilarity {
    fn algorithm(&self) -> ComparisonAlgorithm {
        ComparisonAlgorithm::StructuralSimilarity
    }

    fn compare(&self, test: &PixelBuffer, reference: &PixelBuffer) -> SnapshotResult<Comparison> {
        let map = self.ssim_map(test, reference)?;
        let (width, height) = test.dimensions();
        let diff_pixel_count = diff_count_from_mssim(map.mssim, test.total_pixels());

        let mut diff_image = PixelBuffer::filled(width, height, [0; 4]);
        for y in 0..height {
            for x in 0..width {
                let similarity = map.sample(x, y, width, height);
                let naive = [255, 0, 0, diff_intensity(similarity)];
                let rgba = test.pixel(x, y).unwrap_or([0; 4]);
                diff_image.put_pixel(x, y, resolve_transparent(naive, rgba));
            }
        }

        tracing::debug!(
            mssim = map.mssim,
            map_width = map.width,
            map_height = map.height,
            diff_pixel_count,
            "ssim comparison finished"
        );
        Ok(Comparison {
            diff_pixel_count,
            diff_image,
            mssim: Some(map.mssim),
        })
    }
}

/// `round((1 - mssim) * total_pixels)`
#[must_use]
pub fn diff_count_from_mssim(mssim: f64, total_pixels: u64) -> u32 {
    let proxy = (1.0 - mssim.clamp(0.0, 1.0)) * total_pixels as f64;
    proxy.round().min(f64::from(u32::MAX)) as u32
}

/// Alpha of a red diff pixel for a similarity sample
fn diff_intensity(similarity: f64) -> u8 {
    let similarity = if similarity.is_finite() {
        similarity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (255.0 * (1.0 - similarity)).floor() as u8
}

/// Replace a fully transparent diff pixel with a faded gray of the test pixel
fn resolve_transparent(diff: [u8; 4], test_pixel: [u8; 4]) -> [u8; 4] {
    if diff[3] != 0 {
        return diff;
    }
    let v = faded_gray(test_pixel, TRANSPARENT_BLEND);
    [v, v, v, 255]
}

/// Single-channel f64 image
#[derive(Debug, Clone)]
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Plane {
    /// Integer luma, ignoring alpha
    fn luma(buffer: &PixelBuffer) -> Self {
        let data = buffer
            .as_bytes()
            .chunks_exact(4)
            .map(|p| {
                let [r, g, b] = [p[0], p[1], p[2]].map(u32::from);
                f64::from((77 * r + 150 * g + 29 * b + 128) >> 8)
            })
            .collect();
        Self {
            width: buffer.width() as usize,
            height: buffer.height() as usize,
            data,
        }
    }

    /// Average non-overlapping `factor x factor` blocks
    fn downsample(&self, factor: usize) -> Self {
        let width = (self.width / factor).max(1);
        let height = (self.height / factor).max(1);
        let mut data = Vec::with_capacity(width * height);
        for by in 0..height {
            for bx in 0..width {
                let mut sum = 0.0;
                let mut n = 0.0;
                for y in by * factor..((by + 1) * factor).min(self.height) {
                    for x in bx * factor..((bx + 1) * factor).min(self.width) {
                        sum += self.data[y * self.width + x];
                        n += 1.0;
                    }
                }
                data.push(sum / n);
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    fn product(&self, other: &Self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a * b)
                .collect(),
        }
    }

    /// Separable "valid" correlation with a 1D kernel along both axes
    fn filter_valid(&self, kernel: &[f64]) -> Self {
        let k = kernel.len();
        let out_w = self.width + 1 - k;
        let out_h = self.height + 1 - k;

        let mut rows = vec![0.0; out_w * self.height];
        for y in 0..self.height {
            let line = &self.data[y * self.width..(y + 1) * self.width];
            for x in 0..out_w {
                rows[y * out_w + x] = line[x..x + k]
                    .iter()
                    .zip(kernel)
                    .map(|(v, w)| v * w)
                    .sum();
            }
        }

        let mut data = vec![0.0; out_w * out_h];
        for y in 0..out_h {
            for x in 0..out_w {
                data[y * out_w + x] = kernel
                    .iter()
                    .enumerate()
                    .map(|(i, w)| rows[(y + i) * out_w + x] * w)
                    .sum();
            }
        }

        Self {
            width: out_w,
            height: out_h,
            data,
        }
    }
}

/// Normalized 1D Gaussian of `size` taps
fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f64> {
    let center = (size as f64 - 1.0) / 2.0;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|v| v / total).collect()
}
