//! Per-pixel comparator.
//!
//! Colors are compared with the YIQ perceptual distance from Kotsarenko and
//! Ramos, "Measuring perceived color difference using YIQ NTSC transmission
//! color space in mobile applications". Pixels that look like anti-aliasing
//! (an edge pixel whose darkest or brightest neighbour sits in a flat region
//! of both images) are drawn yellow and not counted.

use super::{blend_white, faded_gray, rgb2y, Comparator, Comparison};
use crate::config::{parameter_in_range, ComparisonAlgorithm};
use crate::pixel_buffer::PixelBuffer;
use crate::result::SnapshotResult;
use std::collections::BTreeMap;

/// Largest possible value of the YIQ squared distance
const MAX_YIQ_DELTA: f64 = 35215.0;

const DIFF_COLOR: [u8; 4] = [255, 0, 0, 255];
const AA_COLOR: [u8; 4] = [255, 255, 0, 255];

/// Tuning for [`PixelDiff`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelDiffOptions {
    /// Matching threshold as a fraction of the color range (0.0-1.0)
    pub threshold: f64,
    /// Opacity of unchanged pixels in the diff image (0.0-1.0)
    pub alpha: f64,
    /// Count anti-aliased pixels as differences
    pub include_aa: bool,
}

impl Default for PixelDiffOptions {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            alpha: 0.1,
            include_aa: false,
        }
    }
}

impl PixelDiffOptions {
    /// Read options from a merged parameter map
    ///
    /// # Errors
    ///
    /// Returns error if `threshold` or `alpha` is outside `[0, 1]`
    pub fn from_parameters(params: &BTreeMap<String, f64>) -> SnapshotResult<Self> {
        Ok(Self {
            threshold: parameter_in_range(params, "threshold", 0.0, 1.0)?,
            alpha: parameter_in_range(params, "alpha", 0.0, 1.0)?,
            include_aa: params.get("include_aa").is_some_and(|v| *v != 0.0),
        })
    }
}

/// Per-pixel threshold comparator
#[derive(Debug, Clone, Default)]
pub struct PixelDiff {
    options: PixelDiffOptions,
}

impl PixelDiff {
    /// Create a comparator with the given options
    #[must_use]
    pub const fn new(options: PixelDiffOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &PixelDiffOptions {
        &self.options
    }
}

impl Comparator for PixelDiff {
    fn algorithm(&self) -> ComparisonAlgorithm {
        ComparisonAlgorithm::PixelDiff
    }

    fn compare(&self, test: &PixelBuffer, reference: &PixelBuffer) -> SnapshotResult<Comparison> {
        reference.ensure_same_dimensions(test)?;
        let (width, height) = test.dimensions();
        let mut diff_image = PixelBuffer::filled(width, height, [0; 4]);

        if test.as_bytes() == reference.as_bytes() {
            for y in 0..height {
                for x in 0..width {
                    self.draw_faded(test, &mut diff_image, x, y);
                }
            }
            return Ok(Comparison {
                diff_pixel_count: 0,
                diff_image,
                mssim: None,
            });
        }

        let img1 = Image::new(test);
        let img2 = Image::new(reference);
        let max_delta = MAX_YIQ_DELTA * self.options.threshold * self.options.threshold;
        let mut diff_pixel_count = 0u32;

        for y in 0..height {
            for x in 0..width {
                let delta = color_delta(img1.at(x, y), img2.at(x, y), false);
                if delta.abs() <= max_delta {
                    self.draw_faded(test, &mut diff_image, x, y);
                } else if !self.options.include_aa
                    && (antialiased(&img1, x, y, &img2) || antialiased(&img2, x, y, &img1))
                {
                    diff_image.put_pixel(x, y, AA_COLOR);
                } else {
                    diff_image.put_pixel(x, y, DIFF_COLOR);
                    diff_pixel_count += 1;
                }
            }
        }

        tracing::debug!(diff_pixel_count, max_delta, "pixel diff finished");
        Ok(Comparison {
            diff_pixel_count,
            diff_image,
            mssim: None,
        })
    }
}

impl PixelDiff {
    fn draw_faded(&self, test: &PixelBuffer, out: &mut PixelBuffer, x: u32, y: u32) {
        if let Some(rgba) = test.pixel(x, y) {
            let v = faded_gray(rgba, self.options.alpha);
            out.put_pixel(x, y, [v, v, v, 255]);
        }
    }
}

/// Borrowed view with clamped neighbourhood helpers
struct Image<'a> {
    buffer: &'a PixelBuffer,
}

impl<'a> Image<'a> {
    const fn new(buffer: &'a PixelBuffer) -> Self {
        Self { buffer }
    }

    fn at(&self, x: u32, y: u32) -> [u8; 4] {
        self.buffer.pixel(x, y).unwrap_or([0; 4])
    }

    /// Inclusive 3x3 bounds around `(x, y)` and whether it touches an edge
    fn neighbourhood(&self, x: u32, y: u32) -> (u32, u32, u32, u32, bool) {
        let x0 = x.saturating_sub(1);
        let y0 = y.saturating_sub(1);
        let x2 = (x + 1).min(self.buffer.width() - 1);
        let y2 = (y + 1).min(self.buffer.height() - 1);
        let on_edge = x == x0 || x == x2 || y == y0 || y == y2;
        (x0, y0, x2, y2, on_edge)
    }
}

/// Whether `(x, y)` in `img` looks like an anti-aliased edge pixel
fn antialiased(img: &Image<'_>, x: u32, y: u32, other: &Image<'_>) -> bool {
    let (x0, y0, x2, y2, on_edge) = img.neighbourhood(x, y);
    let center = img.at(x, y);
    let mut zeroes = u32::from(on_edge);
    let mut min = 0.0;
    let mut max = 0.0;
    let mut darkest = (0, 0);
    let mut brightest = (0, 0);

    for nx in x0..=x2 {
        for ny in y0..=y2 {
            if nx == x && ny == y {
                continue;
            }
            let delta = color_delta(center, img.at(nx, ny), true);
            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                darkest = (nx, ny);
            } else if delta > max {
                max = delta;
                brightest = (nx, ny);
            }
        }
    }

    // an edge needs both a darker and a brighter neighbour
    if min == 0.0 || max == 0.0 {
        return false;
    }

    (has_many_siblings(img, darkest.0, darkest.1) && has_many_siblings(other, darkest.0, darkest.1))
        || (has_many_siblings(img, brightest.0, brightest.1)
            && has_many_siblings(other, brightest.0, brightest.1))
}

/// Whether `(x, y)` has at least three identical neighbours
fn has_many_siblings(img: &Image<'_>, x: u32, y: u32) -> bool {
    let (x0, y0, x2, y2, on_edge) = img.neighbourhood(x, y);
    let center = img.at(x, y);
    let mut zeroes = u32::from(on_edge);

    for nx in x0..=x2 {
        for ny in y0..=y2 {
            if nx == x && ny == y {
                continue;
            }
            if img.at(nx, ny) == center {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }
    false
}

/// Squared YIQ distance; negative when the second pixel is brighter
///
/// With `y_only` only the signed brightness difference is returned.
fn color_delta(a: [u8; 4], b: [u8; 4], y_only: bool) -> f64 {
    if a == b {
        return 0.0;
    }
    let [r1, g1, b1] = premultiply_white(a);
    let [r2, g2, b2] = premultiply_white(b);

    let y1 = rgb2y(r1, g1, b1);
    let y2 = rgb2y(r2, g2, b2);
    let y = y1 - y2;
    if y_only {
        return y;
    }

    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);
    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;
    if y1 > y2 {
        -delta
    } else {
        delta
    }
}

fn premultiply_white(rgba: [u8; 4]) -> [f64; 3] {
    let [r, g, b, a] = rgba.map(f64::from);
    if a < 255.0 {
        let a = a / 255.0;
        [blend_white(r, a), blend_white(g, a), blend_white(b, a)]
    } else {
        [r, g, b]
    }
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}
