//! Matte refinement CLI tool
//!
//! Loads a keyed image, runs it through the refinement worker and writes the
//! result with its alpha channel intact.

use super::{config::CliConfigBuilder, progress::IndicatifProgressReporter};
use crate::{
    config::OutputFormat,
    error::RefineError,
    processor::RefinementService,
    services::{ImageIOService, ProgressTracker},
    tracing_config::{events, spans, TracingConfig, TracingFormat, TracingOutput},
    types::PixelBuffer,
    utils::NumericValidator,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use image::imageops::FilterType;
use log::info;
use std::path::{Path, PathBuf};
use tracing::{debug, Instrument};

/// Local matte refinement: chroma key, choke, feather, morphology and spill removal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "matte-refine")]
pub struct Cli {
    /// Input image
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file (defaults to `<input>_refined.<ext>` next to the input)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = CliOutputFormat::Png)]
    pub format: CliOutputFormat,

    /// JSON file with refinement parameters (camelCase wire names)
    #[arg(long, value_name = "PATH")]
    pub params: Option<PathBuf>,

    /// Key color preset
    #[arg(long, value_enum)]
    pub preset: Option<CliPreset>,

    /// Custom key color as #RRGGBB or #RGB (overrides --preset)
    #[arg(long, value_name = "HEX")]
    pub key_color: Option<String>,

    /// Chroma distance at or below which pixels are keyed out
    #[arg(long)]
    pub tolerance: Option<f32>,

    /// Edge choke iterations; negative values shrink the matte
    #[arg(long, allow_negative_numbers = true)]
    pub choke: Option<i32>,

    /// Feather radius in pixels (0-30)
    #[arg(long)]
    pub feather: Option<u32>,

    /// Morphology operation
    #[arg(long, value_enum)]
    pub morph_op: Option<CliMorphOp>,

    /// Morphology iterations (0-10)
    #[arg(long)]
    pub morph_iter: Option<u32>,

    /// Spill removal strength in percent
    #[arg(long)]
    pub decontaminate: Option<f32>,

    /// Supersampling factor (1-4); the input is upscaled before refinement
    #[arg(long, default_value_t = 1)]
    pub ssaa: u32,

    /// Abort the job after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to this file instead of the console (needs `tracing-files`)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Tiff,
    Rgba8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliPreset {
    Green,
    Magenta,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliMorphOp {
    Dilate,
    Erode,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_tracing(cli.verbose, cli.log_file.as_deref())
        .context("Failed to initialize tracing")?;

    let params = CliConfigBuilder::parameters(&cli)?;
    let service_config = CliConfigBuilder::service(&cli)?;
    let format = CliConfigBuilder::output_format(cli.format);
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| generate_output_path(&cli.input, format));

    info!("Input: {}", cli.input.display());
    debug!(?params, "refinement parameters");

    let span = spans::session(&session_id, &service_config.worker_name);
    let result = async {
        let source = ImageIOService::load_rgba(&cli.input)
            .with_context(|| format!("Failed to load {}", cli.input.display()))?;
        let factor = service_config.ssaa_factor;
        let job_span = spans::job(&cli.input, source.dimensions(), factor);
        let supersampled = upscale(source, factor)?;

        let service =
            RefinementService::create(service_config).context("Failed to start refinement worker")?;
        let mut tracker = if cli.progress {
            ProgressTracker::new(Box::new(IndicatifProgressReporter::new()))
        } else {
            ProgressTracker::console(cli.verbose > 0)
        };

        let refined = service
            .refine(supersampled, params, &mut tracker)
            .instrument(job_span)
            .await
            .context("Refinement failed")?;
        service.destroy().context("Failed to stop refinement worker")?;

        ImageIOService::save(refined.image, &output, format)
            .with_context(|| format!("Failed to save {}", output.display()))?;
        events::performance_metric("refine", refined.elapsed_ms);
        info!(
            "Refined {} -> {} in {}ms",
            cli.input.display(),
            output.display(),
            refined.elapsed_ms
        );
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await;

    if let Err(e) = &result {
        events::error_with_context(&**e, "matte refinement");
    }
    result
}

/// Initialize tracing based on verbosity level, returning the session id
fn init_tracing(verbose_count: u8, log_file: Option<&Path>) -> Result<String> {
    let session_id = uuid::Uuid::new_v4().to_string();

    TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(TracingFormat::Console)
        .with_output(tracing_output(log_file)?)
        .with_session_id(session_id.clone())
        .init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(session_id)
}

/// Map `--log-file` to a tracing destination
fn tracing_output(log_file: Option<&Path>) -> Result<TracingOutput> {
    match log_file {
        None => Ok(TracingOutput::Console),
        #[cfg(feature = "tracing-files")]
        Some(path) => Ok(TracingOutput::File(path.to_path_buf())),
        #[cfg(not(feature = "tracing-files"))]
        Some(path) => anyhow::bail!(
            "cannot log to {}: built without the tracing-files feature",
            path.display()
        ),
    }
}

/// Render the input at `factor` times its size for supersampled refinement
fn upscale(buffer: PixelBuffer, factor: u32) -> Result<PixelBuffer> {
    if factor == 1 {
        return Ok(buffer);
    }
    let (width, height) = upscaled_dimensions(buffer.dimensions(), factor)?;
    let image = buffer.into_rgba_image()?;
    let resized = image::imageops::resize(&image, width, height, FilterType::Triangle);
    Ok(PixelBuffer::from_rgba_image(resized)?)
}

/// Supersampled dimensions, rejecting sizes whose RGBA storage would overflow
fn upscaled_dimensions(dimensions: (u32, u32), factor: u32) -> Result<(u32, u32), RefineError> {
    let (width, height) = dimensions;
    let (Some(scaled_width), Some(scaled_height)) =
        (width.checked_mul(factor), height.checked_mul(factor))
    else {
        return Err(RefineError::validation(format!(
            "{}x{} at SSAA factor {} exceeds the maximum image size",
            width, height, factor
        )));
    };
    NumericValidator::rgba_len(scaled_width, scaled_height)?;
    Ok((scaled_width, scaled_height))
}

/// Generate output path with correct extension
fn generate_output_path(input_path: &Path, format: OutputFormat) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    let dir = input_path.parent().unwrap_or(Path::new("."));

    dir.join(format!(
        "{}_refined.{}",
        stem.to_string_lossy(),
        format.extension()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_uses_format_extension() {
        let path = generate_output_path(Path::new("shots/take1.jpg"), OutputFormat::Png);
        assert_eq!(path, PathBuf::from("shots/take1_refined.png"));
        let path = generate_output_path(Path::new("take1.png"), OutputFormat::Tiff);
        assert_eq!(path, PathBuf::from("take1_refined.tiff"));
    }

    #[test]
    fn test_upscale_multiplies_dimensions() {
        let buffer = PixelBuffer::filled(3, 2, [0, 255, 0, 255]).unwrap();
        let out = upscale(buffer, 3).unwrap();
        assert_eq!(out.dimensions(), (9, 6));
    }

    #[test]
    fn test_upscaled_dimensions_reject_overflow() {
        assert_eq!(upscaled_dimensions((640, 480), 2).unwrap(), (1280, 960));

        let err = upscaled_dimensions((u32::MAX / 2 + 1, 4), 2).unwrap_err();
        assert!(matches!(err, RefineError::Validation(_)));

        // Each side fits in u32 but the RGBA byte count overflows usize
        let err = upscaled_dimensions((u32::MAX / 4, u32::MAX / 4), 4);
        assert!(err.is_err());
    }

    #[test]
    fn test_log_file_selects_tracing_output() {
        assert_eq!(tracing_output(None).unwrap(), TracingOutput::Console);

        let cli =
            Cli::try_parse_from(["matte-refine", "in.png", "--log-file", "logs/run.log"]).unwrap();
        let output = tracing_output(cli.log_file.as_deref());
        #[cfg(feature = "tracing-files")]
        assert_eq!(
            output.unwrap(),
            TracingOutput::File(PathBuf::from("logs/run.log"))
        );
        #[cfg(not(feature = "tracing-files"))]
        assert!(output.is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["matte-refine", "in.png"]).unwrap();
        assert_eq!(cli.ssaa, 1);
        assert_eq!(cli.format, CliOutputFormat::Png);
        assert!(cli.params.is_none());
        assert!(cli.log_file.is_none());
        assert!(!cli.progress);
    }
}
