#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Matte Refinement Library
//!
//! A deterministic, CPU-bound pipeline that turns a rough chroma-keyed cutout
//! into an image with a clean alpha channel. Jobs run on a dedicated
//! background worker with ordered progress and a single terminal result.
//!
//! ## Stages
//!
//! Stage order is fixed:
//!
//! 1. **Chroma key**: zero or soften alpha near the key color
//! 2. **Edge choke**: 4-neighbor expand/shrink of partially transparent pixels
//! 3. **Feather**: separable Gaussian (radius 15 and below) or box blur of alpha
//! 4. **Morphology**: 8-neighbor dilate/erode of the whole alpha channel
//! 5. **Decontamination**: pull semi-transparent edge colors toward luminance
//!
//! SSAA downsampling of a supersampled render happens afterwards, on the
//! caller side.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use matte_refine::{
//!     ChromaPreset, PixelBuffer, ProgressTracker, RefinementParameters, RefinementService,
//!     ServiceConfig,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let service = RefinementService::create(ServiceConfig::default())?;
//! let params = RefinementParameters::builder()
//!     .chroma_preset(ChromaPreset::Green)
//!     .chroma_tolerance(40.0)
//!     .feather_radius(2)
//!     .decontamination_strength(70.0)
//!     .build()?;
//!
//! let buffer = PixelBuffer::filled(64, 64, [0, 255, 0, 255])?;
//! let result = service
//!     .refine(buffer, params, &mut ProgressTracker::console(false))
//!     .await?;
//! assert_eq!(result.image.dimensions(), (64, 64));
//! service.destroy()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): `matte-refine` binary, progress bar and tracing setup
//! - `webp-support` (default): WebP input decoding
//! - `tracing-json`, `tracing-files`: extra subscriber outputs for the CLI

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod services;
pub mod ssaa;
pub mod stages;
pub mod tracing_config;
pub mod types;
pub mod utils;
pub mod worker;

pub use config::{
    ChokeDirection, ChromaColor, ChromaPreset, MorphOp, OutputFormat, RefinementParameters,
    RefinementParametersBuilder, ServiceConfig, ServiceConfigBuilder,
};
pub use error::{ErrorKind, RefineError, Result};
pub use pipeline::{refine_blocking, JobContext};
pub use processor::{RefinementJob, RefinementResult, RefinementService};
pub use services::{
    ConsoleProgressReporter, ImageIOService, JobSummary, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::PixelBuffer;
pub use utils::{ColorParser, NumericValidator};
pub use worker::{JobEvent, WorkerMessage, WorkerRequest};

pub use tracing_config::{events, spans};
#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat, TracingOutput};

/// Refine an in-memory RGBA image on a short-lived worker
///
/// # Examples
///
/// ```rust,no_run
/// use matte_refine::{refine_image, RefinementParameters};
///
/// # async fn example(img: image::RgbaImage) -> anyhow::Result<()> {
/// let params = RefinementParameters::builder().chroma_tolerance(30.0).build()?;
/// let refined = refine_image(img, &params).await?;
/// refined.save("refined.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn refine_image(
    image: image::RgbaImage,
    params: &RefinementParameters,
) -> Result<image::RgbaImage> {
    let buffer = PixelBuffer::from_rgba_image(image)?;
    let refined = refine_buffer(buffer, params).await?;
    refined.into_rgba_image()
}

/// Decode an encoded image (PNG, JPEG, TIFF, WebP) and refine it
pub async fn refine_bytes(image_bytes: &[u8], params: &RefinementParameters) -> Result<PixelBuffer> {
    let buffer = ImageIOService::decode_rgba(image_bytes)?;
    refine_buffer(buffer, params).await
}

async fn refine_buffer(buffer: PixelBuffer, params: &RefinementParameters) -> Result<PixelBuffer> {
    let service = RefinementService::create(ServiceConfig::default())?;
    let result = service
        .refine(buffer, params.clone(), &mut ProgressTracker::no_op())
        .await?;
    service.destroy()?;
    Ok(result.image)
}
