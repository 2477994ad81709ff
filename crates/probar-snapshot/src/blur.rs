//! Pre-comparison Gaussian blur.

use crate::pixel_buffer::PixelBuffer;
use crate::result::SnapshotResult;

/// Blur both sides of a comparison with the same radius
///
/// The radius is used as the Gaussian sigma. Both buffers always receive the
/// identical filter so the metric is not biased toward either side.
///
/// # Errors
///
/// Returns error if a buffer cannot be converted for filtering
pub fn blur_pair(
    test: &PixelBuffer,
    reference: &PixelBuffer,
    radius: f64,
) -> SnapshotResult<(PixelBuffer, PixelBuffer)> {
    Ok((gaussian_blur(test, radius)?, gaussian_blur(reference, radius)?))
}

/// Gaussian blur of a single buffer; non-positive radii return a copy
///
/// # Errors
///
/// Returns error if the buffer cannot be converted for filtering
pub fn gaussian_blur(buffer: &PixelBuffer, radius: f64) -> SnapshotResult<PixelBuffer> {
    if radius <= 0.0 || buffer.total_pixels() == 0 {
        return Ok(buffer.clone());
    }
    let image = buffer.to_rgba_image()?;
    Ok(PixelBuffer::from(image::imageops::blur(&image, radius as f32)))
}
