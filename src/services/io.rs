//! Image I/O operations service
//!
//! Decoding inputs into `PixelBuffer`s and writing refined buffers back out,
//! kept apart from the pixel pipeline itself.

use crate::{
    config::OutputFormat,
    error::{RefineError, Result},
    types::PixelBuffer,
};
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image file into an RGBA pixel buffer
    ///
    /// # Examples
    /// ```rust,no_run
    /// use matte_refine::services::ImageIOService;
    ///
    /// let buffer = ImageIOService::load_rgba("keyed.png")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<PixelBuffer> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(RefineError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        let image = match image::open(path_ref) {
            Ok(img) => img,
            Err(e) => {
                // Extension may lie about the content; retry with content sniffing
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );
                let data = std::fs::read(path_ref).map_err(|io_err| {
                    RefineError::file_io_error("read image data", path_ref, &io_err)
                })?;
                image::load_from_memory(&data)?
            },
        };

        PixelBuffer::from_rgba_image(image.to_rgba8())
    }

    /// Decode encoded image bytes (PNG, JPEG, TIFF, WebP) into a pixel buffer
    pub fn decode_rgba(bytes: &[u8]) -> Result<PixelBuffer> {
        let image = image::load_from_memory(bytes)?;
        PixelBuffer::from_rgba_image(image.to_rgba8())
    }

    /// Save a pixel buffer, creating parent directories as needed
    pub fn save<P: AsRef<Path>>(buffer: PixelBuffer, path: P, format: OutputFormat) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RefineError::file_io_error("create output directory", parent, &e)
            })?;
        }

        match format {
            OutputFormat::Png => buffer
                .into_rgba_image()?
                .save_with_format(path_ref, image::ImageFormat::Png)?,
            OutputFormat::Tiff => buffer
                .into_rgba_image()?
                .save_with_format(path_ref, image::ImageFormat::Tiff)?,
            OutputFormat::Rgba8 => std::fs::write(path_ref, buffer.as_bytes())
                .map_err(|e| RefineError::file_io_error("write RGBA8 data", path_ref, &e))?,
        }

        log::debug!("Saved refined image to {}", path_ref.display());
        Ok(())
    }
}
