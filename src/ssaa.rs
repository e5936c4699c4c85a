//! Supersampled anti-aliasing finalization
//!
//! Box-downsamples a buffer rendered at `factor`x the target resolution.
//! Runs on the caller side after the worker has handed the buffer back.

use crate::{
    config::MAX_SSAA_FACTOR,
    error::{RefineError, Result},
    types::PixelBuffer,
};

/// Check that `width`x`height` can be reduced by `factor`
pub fn validate_factor(width: u32, height: u32, factor: u32) -> Result<()> {
    if factor == 0 || factor > MAX_SSAA_FACTOR {
        return Err(RefineError::config_value_error(
            "ssaa_factor",
            factor,
            &format!("1-{}", MAX_SSAA_FACTOR),
        ));
    }
    if width % factor != 0 || height % factor != 0 {
        return Err(RefineError::validation(format!(
            "{}x{} is not divisible by SSAA factor {}",
            width, height, factor
        )));
    }
    Ok(())
}

/// Average every `factor`x`factor` block into one pixel
///
/// A factor of 1 hands the buffer back unchanged.
pub fn downsample(buffer: PixelBuffer, factor: u32) -> Result<PixelBuffer> {
    let (width, height) = buffer.dimensions();
    validate_factor(width, height, factor)?;
    if factor == 1 {
        return Ok(buffer);
    }

    let (out_w, out_h) = (width / factor, height / factor);
    let n = factor as usize;
    let block = (n * n) as u32;
    let src = buffer.as_bytes();
    let stride = width as usize * 4;
    let mut out = Vec::with_capacity(out_w as usize * out_h as usize * 4);

    for by in 0..out_h as usize {
        for bx in 0..out_w as usize {
            let mut sums = [0u32; 4];
            for dy in 0..n {
                let row = (by * n + dy) * stride;
                for dx in 0..n {
                    let i = row + (bx * n + dx) * 4;
                    for (c, sum) in sums.iter_mut().enumerate() {
                        *sum += u32::from(src[i + c]);
                    }
                }
            }
            out.extend(sums.iter().map(|&s| ((s + block / 2) / block) as u8));
        }
    }

    PixelBuffer::new(out_w, out_h, out)
}
