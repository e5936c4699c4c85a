//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliMorphOp, CliOutputFormat, CliPreset};
use crate::{
    config::{
        ChromaPreset, MorphOp, OutputFormat, RefinementParameters, RefinementParametersBuilder,
        ServiceConfig,
    },
    utils::ColorParser,
};
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build job parameters: `--params` file first, then individual flags on top
    pub(crate) fn parameters(cli: &Cli) -> Result<RefinementParameters> {
        let base = match &cli.params {
            Some(path) => RefinementParameters::from_json_file(path)
                .with_context(|| format!("Failed to load parameters from {}", path.display()))?,
            None => RefinementParameters::default(),
        };
        let mut builder = RefinementParametersBuilder::from_parameters(base);

        if let Some(preset) = cli.preset {
            builder = builder.chroma_preset(Self::preset(preset));
        }
        if let Some(hex) = &cli.key_color {
            let color = ColorParser::parse_hex(hex)
                .with_context(|| format!("Invalid key color '{}'", hex))?;
            builder = builder.target_chroma(color);
        }
        if let Some(tolerance) = cli.tolerance {
            builder = builder.chroma_tolerance(tolerance);
        }
        if let Some(choke) = cli.choke {
            builder = builder.edge_choke(choke);
        }
        if let Some(radius) = cli.feather {
            builder = builder.feather_radius(radius);
        }
        if let Some(op) = cli.morph_op {
            builder = builder.morph_op(Self::morph_op(op));
        }
        if let Some(iterations) = cli.morph_iter {
            builder = builder.morph_iter(iterations);
        }
        if let Some(strength) = cli.decontaminate {
            builder = builder.decontamination_strength(strength);
        }

        builder.build().context("Invalid refinement parameters")
    }

    /// Build the service configuration for this invocation
    pub(crate) fn service(cli: &Cli) -> Result<ServiceConfig> {
        let mut builder = ServiceConfig::builder().ssaa_factor(cli.ssaa);
        if let Some(ms) = cli.timeout_ms {
            builder = builder.job_timeout(Duration::from_millis(ms));
        }
        builder.build().context("Invalid service configuration")
    }

    pub(crate) fn output_format(format: CliOutputFormat) -> OutputFormat {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Tiff => OutputFormat::Tiff,
            CliOutputFormat::Rgba8 => OutputFormat::Rgba8,
        }
    }

    fn preset(preset: CliPreset) -> ChromaPreset {
        match preset {
            CliPreset::Green => ChromaPreset::Green,
            CliPreset::Magenta => ChromaPreset::Magenta,
        }
    }

    fn morph_op(op: CliMorphOp) -> MorphOp {
        match op {
            CliMorphOp::Dilate => MorphOp::Dilate,
            CliMorphOp::Erode => MorphOp::Erode,
        }
    }
}
