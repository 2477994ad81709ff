//! Decoded RGBA raster used by every comparator.

use crate::result::{SnapshotError, SnapshotResult};
use image::RgbaImage;

/// Interleaved, row-major RGBA8 pixel data
///
/// The length of `data` is always `width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer from raw RGBA bytes
    ///
    /// # Errors
    ///
    /// Returns error if `data` does not hold exactly `width * height` pixels
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> SnapshotResult<Self> {
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(SnapshotError::InvalidBuffer {
                message: format!(
                    "{width}x{height} needs {expected} bytes, got {}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a buffer where every pixel has the same color
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels
    #[must_use]
    pub const fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Raw RGBA bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw RGBA bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer and return its bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGBA value at `(x, y)`, `None` when out of bounds
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrite the pixel at `(x, y)`; out-of-bounds writes are ignored
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x < self.width && y < self.height {
            let i = self.offset(x, y);
            self.data[i..i + 4].copy_from_slice(&rgba);
        }
    }

    /// Fail unless `other` has the same width and height
    ///
    /// `self` is treated as the baseline side of the comparison.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DimensionMismatch`] on any size difference
    pub fn ensure_same_dimensions(&self, other: &Self) -> SnapshotResult<()> {
        if self.dimensions() == other.dimensions() {
            return Ok(());
        }
        Err(SnapshotError::DimensionMismatch {
            expected_width: self.width,
            expected_height: self.height,
            actual_width: other.width,
            actual_height: other.height,
        })
    }

    /// Copy into an `image` crate buffer
    ///
    /// # Errors
    ///
    /// Returns error if the buffer cannot be represented (never for buffers
    /// built through this type's constructors)
    pub fn to_rgba_image(&self) -> SnapshotResult<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            SnapshotError::InvalidBuffer {
                message: format!("{}x{} buffer rejected by image", self.width, self.height),
            }
        })
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}
