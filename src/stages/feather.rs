//! Feather stage
//!
//! Separable blur of the alpha channel. Radii up to
//! [`GAUSSIAN_RADIUS_LIMIT`] use a Gaussian with `sigma = radius / 3`;
//! larger radii fall back to a box filter. Near the image edges both
//! kernels renormalize over the taps that land inside the image instead of
//! padding or wrapping.

use crate::{
    config::GAUSSIAN_RADIUS_LIMIT,
    error::{RefineError, Result},
    pipeline::JobContext,
    services::ProcessingStage,
    types::PixelBuffer,
};

/// Blur kernel selected for a radius
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatherKernel {
    Gaussian,
    Box,
}

impl FeatherKernel {
    #[must_use]
    pub fn for_radius(radius: u32) -> Self {
        if radius > GAUSSIAN_RADIUS_LIMIT {
            FeatherKernel::Box
        } else {
            FeatherKernel::Gaussian
        }
    }
}

/// Row chunks per pass that get their own progress report
const PROGRESS_CHUNKS: usize = 10;

/// Feather the alpha channel of `buffer` by `radius`
///
/// Cancellation is checked before every row of both passes.
pub fn apply(buffer: &mut PixelBuffer, radius: u32, ctx: &mut JobContext<'_>) -> Result<()> {
    if radius == 0 {
        return Ok(());
    }

    let weights = kernel_weights(FeatherKernel::for_radius(radius), radius)?;
    let (width, height) = (buffer.width() as usize, buffer.height() as usize);
    let src = buffer.alpha_plane();
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];

    for_each_row(ctx, height, (0.0, 0.5), |y| {
        horizontal_row(&src, &mut tmp, width, y, &weights);
    })?;
    for_each_row(ctx, height, (0.5, 1.0), |y| {
        vertical_row(&tmp, &mut out, width, height, y, &weights);
    })?;

    buffer.write_alpha_plane(&out);
    Ok(())
}

/// Run `row` for every row, reporting the `span` fraction of the stage in chunks
fn for_each_row(
    ctx: &mut JobContext<'_>,
    height: usize,
    span: (f32, f32),
    mut row: impl FnMut(usize),
) -> Result<()> {
    let (from, to) = span;
    let chunk_rows = (height / PROGRESS_CHUNKS).max(1);

    for y in 0..height {
        ctx.checkpoint()?;
        row(y);
        let done = y + 1;
        if done % chunk_rows == 0 || done == height {
            let fraction = from + (to - from) * done as f32 / height as f32;
            ctx.report(ProcessingStage::Feather, fraction);
        }
    }
    Ok(())
}

/// Normalized 1-D weights of length `2 * radius + 1`
pub fn kernel_weights(kernel: FeatherKernel, radius: u32) -> Result<Vec<f64>> {
    let r = radius as i64;
    let raw: Vec<f64> = match kernel {
        FeatherKernel::Box => vec![1.0; (2 * r + 1) as usize],
        FeatherKernel::Gaussian => {
            if radius == 0 {
                return Ok(vec![1.0]);
            }
            let sigma = f64::from(radius) / 3.0;
            let denom = 2.0 * sigma * sigma;
            (-r..=r)
                .map(|i| {
                    let x = i as f64;
                    (-x * x / denom).exp()
                })
                .collect()
        },
    };

    let sum: f64 = raw.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(RefineError::processing_stage_error(
            ProcessingStage::Feather.name(),
            "kernel sum is zero",
        ));
    }
    Ok(raw.into_iter().map(|w| w / sum).collect())
}

fn horizontal_row(src: &[u8], dst: &mut [u8], width: usize, y: usize, k: &[f64]) {
    let radius = (k.len() / 2) as isize;
    let row = &src[y * width..(y + 1) * width];
    for x in 0..width {
        let mut acc = 0.0f64;
        let mut used = 0.0f64;
        for (ki, &kw) in k.iter().enumerate() {
            let sx = x as isize + ki as isize - radius;
            if sx < 0 || sx >= width as isize {
                continue;
            }
            acc += kw * f64::from(row[sx as usize]);
            used += kw;
        }
        dst[y * width + x] = to_u8(acc, used);
    }
}

fn vertical_row(src: &[u8], dst: &mut [u8], width: usize, height: usize, y: usize, k: &[f64]) {
    let radius = (k.len() / 2) as isize;
    for x in 0..width {
        let mut acc = 0.0f64;
        let mut used = 0.0f64;
        for (ki, &kw) in k.iter().enumerate() {
            let sy = y as isize + ki as isize - radius;
            if sy < 0 || sy >= height as isize {
                continue;
            }
            acc += kw * f64::from(src[sy as usize * width + x]);
            used += kw;
        }
        dst[y * width + x] = to_u8(acc, used);
    }
}

fn to_u8(acc: f64, used: f64) -> u8 {
    if used <= 0.0 {
        return 0;
    }
    (acc / used).round().clamp(0.0, 255.0) as u8
}
