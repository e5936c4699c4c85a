//! Core types for matte refinement operations

use crate::{
    error::{RefineError, Result},
    utils::NumericValidator,
};
use image::RgbaImage;

/// Width x height RGBA8 image, interleaved and row-major
///
/// A `PixelBuffer` is owned by exactly one execution context at a time.
/// Dispatching a job takes the buffer by value, so the caller cannot touch
/// the pixels again until the worker hands them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, validating `data.len() == width * height * 4`
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        NumericValidator::validate_rgba_buffer(data.len(), width, height)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a buffer filled with a single RGBA value
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let len = NumericValidator::rgba_len(width, height)?;
        let data = rgba.iter().copied().cycle().take(len).collect();
        Self::new(width, height, data)
    }

    /// Take ownership of an `image::RgbaImage` without copying
    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    /// Convert back into an `image::RgbaImage` without copying
    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data).ok_or_else(|| {
            RefineError::processing("pixel buffer does not match its dimensions")
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.data.len() / 4
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Release the underlying bytes
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Byte offset of pixel `(x, y)`
    #[must_use]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// RGBA value at `(x, y)`
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Alpha value at `(x, y)`
    #[must_use]
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.data[self.offset(x, y) + 3]
    }

    pub fn set_alpha(&mut self, x: u32, y: u32, alpha: u8) {
        let i = self.offset(x, y) + 3;
        self.data[i] = alpha;
    }

    /// Copy the alpha channel into a dense plane
    #[must_use]
    pub fn alpha_plane(&self) -> Vec<u8> {
        self.data.chunks_exact(4).map(|px| px[3]).collect()
    }

    /// Overwrite the alpha channel from a dense plane of `pixel_count()` values
    pub fn write_alpha_plane(&mut self, plane: &[u8]) {
        debug_assert_eq!(plane.len(), self.pixel_count());
        for (px, &a) in self.data.chunks_exact_mut(4).zip(plane) {
            px[3] = a;
        }
    }
}
