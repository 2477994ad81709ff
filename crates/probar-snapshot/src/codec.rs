//! Image codec seam.
//!
//! The engine only sees encoded bytes at its edges; everything in between
//! works on [`PixelBuffer`]s produced by an [`ImageCodec`].

use crate::pixel_buffer::PixelBuffer;
use crate::result::{SnapshotError, SnapshotResult};
use image::ImageEncoder;

/// Converts between encoded image bytes and RGBA pixel buffers
pub trait ImageCodec {
    /// Decode bytes into an RGBA buffer
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Decode`] if the bytes are not a valid image
    fn decode(&self, bytes: &[u8]) -> SnapshotResult<PixelBuffer>;

    /// Encode an RGBA buffer
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Encode`] if serialization fails
    fn encode(&self, buffer: &PixelBuffer) -> SnapshotResult<Vec<u8>>;

    /// MIME type of [`ImageCodec::encode`] output
    fn mime_type(&self) -> &'static str;
}

/// PNG codec backed by the `image` crate
///
/// Decoding accepts every format enabled on the `image` dependency (PNG and
/// JPEG); encoding always produces PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> SnapshotResult<PixelBuffer> {
        let decoded = image::load_from_memory(bytes).map_err(|e| SnapshotError::Decode {
            message: e.to_string(),
        })?;
        Ok(PixelBuffer::from(decoded.to_rgba8()))
    }

    fn encode(&self, buffer: &PixelBuffer) -> SnapshotResult<Vec<u8>> {
        let mut out = Vec::new();
        image::codecs::png::PngEncoder::new(&mut out)
            .write_image(
                buffer.as_bytes(),
                buffer.width(),
                buffer.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| SnapshotError::Encode {
                message: e.to_string(),
            })?;
        Ok(out)
    }

    fn mime_type(&self) -> &'static str {
        "image/png"
    }
}
