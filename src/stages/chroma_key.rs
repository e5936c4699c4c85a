//! Chroma key stage
//!
//! Keys out pixels close to the reference color and softens alpha in a
//! fixed band just beyond the tolerance. Alpha is only ever lowered; RGB is
//! left untouched.

use crate::{
    config::ChromaColor, error::Result, pipeline::JobContext, services::ProcessingStage,
    types::PixelBuffer,
};

/// Width of the linear soft band beyond the tolerance, in RGB distance units
pub const SOFT_BAND: f64 = 30.0;

/// Number of row chunks progress is reported in
const PROGRESS_CHUNKS: u32 = 10;

/// Euclidean distance between a pixel's RGB and the key color
#[must_use]
pub fn chroma_distance(r: u8, g: u8, b: u8, target: ChromaColor) -> f64 {
    let dr = f64::from(r) - f64::from(target.r);
    let dg = f64::from(g) - f64::from(target.g);
    let db = f64::from(b) - f64::from(target.b);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Keyed alpha for a pixel at `distance` from the key color
#[must_use]
pub fn keyed_alpha(distance: f64, tolerance: f64, alpha: u8) -> u8 {
    if distance <= tolerance {
        0
    } else if distance <= tolerance + SOFT_BAND {
        let soft = ((distance - tolerance) / SOFT_BAND * 255.0).round();
        alpha.min(soft.clamp(0.0, 255.0) as u8)
    } else {
        alpha
    }
}

/// Apply the chroma key to every pixel of `buffer`
pub fn apply(
    buffer: &mut PixelBuffer,
    target: ChromaColor,
    tolerance: f32,
    ctx: &mut JobContext<'_>,
) -> Result<()> {
    let tolerance = f64::from(tolerance);
    let row_len = buffer.width() as usize * 4;
    let height = buffer.height();
    let chunk_rows = (height / PROGRESS_CHUNKS).max(1) as usize;

    let mut rows_done = 0u32;
    for chunk in buffer.as_bytes_mut().chunks_mut(row_len * chunk_rows) {
        ctx.checkpoint()?;
        for px in chunk.chunks_exact_mut(4) {
            let distance = chroma_distance(px[0], px[1], px[2], target);
            px[3] = keyed_alpha(distance, tolerance, px[3]);
        }
        rows_done += (chunk.len() / row_len) as u32;
        ctx.report(
            ProcessingStage::ChromaKey,
            rows_done as f32 / height as f32,
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChromaPreset;

    const GREEN: ChromaColor = ChromaPreset::Green.color();

    #[test]
    fn test_solid_green_is_fully_keyed() {
        let mut buffer = PixelBuffer::filled(4, 4, [0, 255, 0, 255]).unwrap();
        apply(&mut buffer, GREEN, 10.0, &mut JobContext::detached()).unwrap();
        assert!(buffer.alpha_plane().iter().all(|&a| a == 0));
    }

    #[test]
    fn test_soft_band_is_linear() {
        assert_eq!(keyed_alpha(10.0, 10.0, 255), 0);
        assert_eq!(keyed_alpha(25.0, 10.0, 255), 128);
        assert_eq!(keyed_alpha(40.0, 10.0, 255), 255);
        assert_eq!(keyed_alpha(40.1, 10.0, 200), 200);
    }

    #[test]
    fn test_soft_band_never_raises_alpha() {
        assert_eq!(keyed_alpha(38.0, 10.0, 50), 50);
        assert_eq!(keyed_alpha(11.0, 10.0, 3), 3);
    }

    #[test]
    fn test_zero_tolerance_keys_exact_match() {
        assert_eq!(keyed_alpha(0.0, 0.0, 255), 0);
        assert_eq!(keyed_alpha(15.0, 0.0, 255), 128);
    }

    #[test]
    fn test_rgb_untouched_and_far_pixels_identity() {
        let mut buffer = PixelBuffer::filled(3, 3, [200, 40, 90, 180]).unwrap();
        let before = buffer.clone();
        apply(&mut buffer, GREEN, 50.0, &mut JobContext::detached()).unwrap();
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_distance() {
        assert_eq!(chroma_distance(0, 255, 0, GREEN), 0.0);
        assert_eq!(chroma_distance(3, 255, 4, GREEN), 5.0);
    }

    #[test]
    fn test_reports_progress_up_to_stage_end() {
        let mut seen = Vec::new();
        let mut ctx = JobContext::new(
            |p| seen.push(p),
            tokio_util::sync::CancellationToken::new(),
        );
        let mut buffer = PixelBuffer::filled(2, 25, [0, 0, 0, 255]).unwrap();
        apply(&mut buffer, GREEN, 10.0, &mut ctx).unwrap();
        drop(ctx);

        assert!(seen.len() > 1);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last(), Some(&20));
    }
}
