//! Decontamination stage
//!
//! Pulls the color of semi-transparent edge pixels toward their luminance,
//! in proportion to transparency and strength. Alpha is never modified.

use crate::{error::Result, pipeline::JobContext, services::ProcessingStage, types::PixelBuffer};

/// Pixels with alpha at or above this value are left alone
pub const ALPHA_CUTOFF: u8 = 200;

/// Number of row chunks progress is reported in
const PROGRESS_CHUNKS: u32 = 10;

/// Rec. 601 luma of an RGB triple
#[must_use]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Decontaminate one RGBA pixel in place
pub fn decontaminate_pixel(px: &mut [u8], strength: f32) {
    let alpha = px[3];
    if alpha == 0 || alpha >= ALPHA_CUTOFF {
        return;
    }

    let gray = luminance(px[0], px[1], px[2]);
    let f = (1.0 - f64::from(alpha) / 255.0) * (f64::from(strength) / 100.0);
    for c in &mut px[..3] {
        let blended = f64::from(*c) * (1.0 - f) + gray * f;
        *c = blended.round().clamp(0.0, 255.0) as u8;
    }
}

/// Apply spill removal with `strength` in percent
pub fn apply(buffer: &mut PixelBuffer, strength: f32, ctx: &mut JobContext<'_>) -> Result<()> {
    if strength <= 0.0 {
        return Ok(());
    }

    let row_len = buffer.width() as usize * 4;
    let height = buffer.height();
    let chunk_rows = (height / PROGRESS_CHUNKS).max(1) as usize;

    let mut rows_done = 0u32;
    for chunk in buffer.as_bytes_mut().chunks_mut(row_len * chunk_rows) {
        ctx.checkpoint()?;
        for px in chunk.chunks_exact_mut(4) {
            decontaminate_pixel(px, strength);
        }
        rows_done += (chunk.len() / row_len) as u32;
        ctx.report(
            ProcessingStage::Decontamination,
            rows_done as f32 / height as f32,
        );
    }

    Ok(())
}
