//! Morphology stage
//!
//! Iterative 8-neighbor dilate or erode over the whole alpha channel. A
//! coarser cleanup than the edge choke: no pixel is skipped.

use super::{neighborhood_pass, Reduce, EIGHT_NEIGHBORS};
use crate::{
    config::MorphOp, error::Result, pipeline::JobContext, services::ProcessingStage,
    types::PixelBuffer,
};

/// Apply `iterations` passes of `op` to the alpha channel
pub fn apply(
    buffer: &mut PixelBuffer,
    op: MorphOp,
    iterations: u32,
    ctx: &mut JobContext<'_>,
) -> Result<()> {
    if iterations == 0 {
        return Ok(());
    }

    let (width, height) = (buffer.width() as usize, buffer.height() as usize);
    let mut current = buffer.alpha_plane();
    let mut next = vec![0u8; current.len()];

    for i in 0..iterations {
        ctx.checkpoint()?;
        morph_plane(&current, &mut next, width, height, op);
        std::mem::swap(&mut current, &mut next);
        ctx.report(
            ProcessingStage::Morphology,
            (i + 1) as f32 / iterations as f32,
        );
    }

    buffer.write_alpha_plane(&current);
    Ok(())
}

/// One dilate/erode pass from `src` into `dst`
pub fn morph_plane(src: &[u8], dst: &mut [u8], width: usize, height: usize, op: MorphOp) {
    let reduce = match op {
        MorphOp::Dilate => Reduce::Max,
        MorphOp::Erode => Reduce::Min,
    };
    neighborhood_pass(src, dst, width, height, &EIGHT_NEIGHBORS, reduce, false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::buffer_with_alpha;

    fn ring_10x10() -> Vec<u8> {
        let mut alpha = vec![0u8; 100];
        for i in 2..=7 {
            alpha[2 * 10 + i] = 255;
            alpha[7 * 10 + i] = 255;
            alpha[i * 10 + 2] = 255;
            alpha[i * 10 + 7] = 255;
        }
        alpha
    }

    #[test]
    fn test_single_dilate_grows_ring_by_one() {
        let alpha = ring_10x10();
        let mut buffer = buffer_with_alpha(10, 10, &alpha);
        apply(&mut buffer, MorphOp::Dilate, 1, &mut JobContext::detached()).unwrap();
        let out = buffer.alpha_plane();

        for y in 0..10i32 {
            for x in 0..10i32 {
                let touches_ring = (-1..=1).any(|dy| {
                    (-1..=1).any(|dx| {
                        let (nx, ny) = (x + dx, y + dy);
                        (0..10).contains(&nx)
                            && (0..10).contains(&ny)
                            && alpha[(ny * 10 + nx) as usize] == 255
                    })
                });
                let expected = if touches_ring { 255 } else { 0 };
                assert_eq!(out[(y * 10 + x) as usize], expected, "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_erode_removes_isolated_pixel() {
        let mut alpha = vec![255u8; 25];
        alpha[12] = 0;
        let mut buffer = buffer_with_alpha(5, 5, &alpha);
        apply(&mut buffer, MorphOp::Erode, 1, &mut JobContext::detached()).unwrap();
        let out = buffer.alpha_plane();

        // Every interior pixel touches the hole
        for y in 1..4 {
            for x in 1..4 {
                assert_eq!(out[y * 5 + x], 0);
            }
        }
        assert_eq!(out[0], 255);
    }

    #[test]
    fn test_affects_opaque_and_transparent_pixels() {
        #[rustfmt::skip]
        let alpha = [
            0, 0,   0, 0,
            0, 255, 0, 0,
            0, 0,   0, 0,
            0, 0,   0, 0,
        ];
        let mut buffer = buffer_with_alpha(4, 4, &alpha);
        apply(&mut buffer, MorphOp::Dilate, 1, &mut JobContext::detached()).unwrap();
        let out = buffer.alpha_plane();
        assert_eq!(out[10], 255);
        assert_eq!(out[6], 255);
    }

    #[test]
    fn test_iterations_report_progress() {
        let mut seen = Vec::new();
        let mut ctx = JobContext::new(
            |p| seen.push(p),
            tokio_util::sync::CancellationToken::new(),
        );
        let mut buffer = buffer_with_alpha(4, 4, &[10; 16]);
        apply(&mut buffer, MorphOp::Erode, 3, &mut ctx).unwrap();
        drop(ctx);
        assert_eq!(seen, vec![75, 80, 85]);
    }
}
