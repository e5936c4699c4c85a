//! Edge choke stage
//!
//! Expands or shrinks partially transparent edge pixels with a 4-neighbor
//! max/min. Fully transparent and fully opaque pixels are never touched.

use super::{neighborhood_pass, Reduce, FOUR_NEIGHBORS};
use crate::{
    config::ChokeDirection, error::Result, pipeline::JobContext, services::ProcessingStage,
    types::PixelBuffer,
};

/// Apply `iterations` choke passes in `direction`
pub fn apply(
    buffer: &mut PixelBuffer,
    direction: ChokeDirection,
    iterations: u32,
    ctx: &mut JobContext<'_>,
) -> Result<()> {
    if iterations == 0 {
        return Ok(());
    }

    let reduce = match direction {
        ChokeDirection::Expand => Reduce::Max,
        ChokeDirection::Shrink => Reduce::Min,
    };
    let (width, height) = (buffer.width() as usize, buffer.height() as usize);
    let mut current = buffer.alpha_plane();
    let mut next = vec![0u8; current.len()];

    for i in 0..iterations {
        ctx.checkpoint()?;
        neighborhood_pass(
            &current,
            &mut next,
            width,
            height,
            &FOUR_NEIGHBORS,
            reduce,
            true,
        );
        std::mem::swap(&mut current, &mut next);
        ctx.report(
            ProcessingStage::EdgeChoke,
            (i + 1) as f32 / iterations as f32,
        );
    }

    buffer.write_alpha_plane(&current);
    Ok(())
}
