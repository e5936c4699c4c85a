//! Configuration types for matte refinement operations

use crate::{error::Result, utils::NumericValidator};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Maximum effective edge choke iterations
pub const MAX_EDGE_CHOKE: u32 = 5;
/// Maximum effective feather radius
pub const MAX_FEATHER_RADIUS: u32 = 30;
/// Feather radii above this use the box blur instead of the Gaussian
pub const GAUSSIAN_RADIUS_LIMIT: u32 = 15;
/// Maximum effective morphology iterations
pub const MAX_MORPH_ITERATIONS: u32 = 10;
/// Largest supported supersampling factor
pub const MAX_SSAA_FACTOR: u32 = 4;
/// Default wait for a timed-out job to reach its terminal event
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Output formats that preserve the refined alpha channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// TIFF with alpha channel transparency
    Tiff,
    /// Raw RGBA8 pixel data (4 bytes per pixel)
    Rgba8,
}

impl OutputFormat {
    /// Conventional file extension
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::Rgba8 => "rgba",
        }
    }
}

/// Reference color for chroma keying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ChromaColor {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for ChromaColor {
    fn default() -> Self {
        ChromaPreset::Green.color()
    }
}

/// Screen colors the caller can key against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChromaPreset {
    /// Pure green screen (0, 255, 0)
    Green,
    /// Pure magenta screen (255, 0, 255)
    Magenta,
}

impl ChromaPreset {
    #[must_use]
    pub const fn color(self) -> ChromaColor {
        match self {
            Self::Green => ChromaColor::new(0, 255, 0),
            Self::Magenta => ChromaColor::new(255, 0, 255),
        }
    }
}

impl std::fmt::Display for ChromaPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Magenta => write!(f, "magenta"),
        }
    }
}

/// Morphological operation applied after feathering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MorphOp {
    /// Grow opaque regions (8-neighbor max)
    #[default]
    Dilate,
    /// Shrink opaque regions (8-neighbor min)
    Erode,
}

impl std::fmt::Display for MorphOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dilate => write!(f, "dilate"),
            Self::Erode => write!(f, "erode"),
        }
    }
}

/// Direction selected by the sign of `edgeChoke`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChokeDirection {
    /// Positive choke: take the 4-neighbor maximum
    Expand,
    /// Negative choke: take the 4-neighbor minimum
    Shrink,
}

/// Knobs for a single refinement job
///
/// Field names follow the camelCase wire format of the worker protocol.
/// `edge_choke`, `feather_radius` and `morph_iter` are stored as given and
/// clamped through the accessor methods; the builder clamps eagerly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefinementParameters {
    /// Reference color for keying
    pub target_chroma: ChromaColor,

    /// Euclidean RGB distance at or below which pixels are keyed out
    pub chroma_tolerance: f32,

    /// Signed choke iterations; positive expands, negative shrinks
    pub edge_choke: i32,

    /// Blur radius for the alpha channel
    pub feather_radius: u32,

    /// Morphology operation
    pub morph_op: MorphOp,

    /// Morphology iterations
    pub morph_iter: u32,

    /// Spill removal strength in percent (0-100)
    pub decontamination_strength: f32,
}

impl Default for RefinementParameters {
    fn default() -> Self {
        Self {
            target_chroma: ChromaColor::default(),
            chroma_tolerance: 0.0,
            edge_choke: 0,
            feather_radius: 0,
            morph_op: MorphOp::Dilate,
            morph_iter: 0,
            decontamination_strength: 0.0,
        }
    }
}

impl RefinementParameters {
    /// Create a new parameters builder
    #[must_use]
    pub fn builder() -> RefinementParametersBuilder {
        RefinementParametersBuilder::new()
    }

    /// Load parameters from a JSON file using the wire field names
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }

    /// Validate the parameters that are rejected rather than clamped
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_non_negative(self.chroma_tolerance, "chromaTolerance")?;
        NumericValidator::validate_percent(
            self.decontamination_strength,
            "decontaminationStrength",
        )?;
        Ok(())
    }

    /// Effective choke direction and iteration count
    #[must_use]
    pub fn choke(&self) -> (ChokeDirection, u32) {
        let direction = if self.edge_choke < 0 {
            ChokeDirection::Shrink
        } else {
            ChokeDirection::Expand
        };
        (direction, self.edge_choke.unsigned_abs().min(MAX_EDGE_CHOKE))
    }

    /// Effective feather radius
    #[must_use]
    pub fn feather_radius(&self) -> u32 {
        self.feather_radius.min(MAX_FEATHER_RADIUS)
    }

    /// Effective morphology iteration count
    #[must_use]
    pub fn morph_iterations(&self) -> u32 {
        self.morph_iter.min(MAX_MORPH_ITERATIONS)
    }
}

/// Builder for `RefinementParameters`
pub struct RefinementParametersBuilder {
    params: RefinementParameters,
}

impl RefinementParametersBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: RefinementParameters::default(),
        }
    }

    /// Start from existing parameters, clamping them like the setters do
    #[must_use]
    pub fn from_parameters(params: RefinementParameters) -> Self {
        Self::new()
            .target_chroma(params.target_chroma)
            .chroma_tolerance(params.chroma_tolerance)
            .edge_choke(params.edge_choke)
            .feather_radius(params.feather_radius)
            .morph_op(params.morph_op)
            .morph_iter(params.morph_iter)
            .decontamination_strength(params.decontamination_strength)
    }

    #[must_use]
    pub fn target_chroma(mut self, color: ChromaColor) -> Self {
        self.params.target_chroma = color;
        self
    }

    #[must_use]
    pub fn chroma_preset(mut self, preset: ChromaPreset) -> Self {
        self.params.target_chroma = preset.color();
        self
    }

    #[must_use]
    pub fn chroma_tolerance(mut self, tolerance: f32) -> Self {
        self.params.chroma_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn edge_choke(mut self, choke: i32) -> Self {
        let limit = MAX_EDGE_CHOKE as i32;
        self.params.edge_choke = choke.clamp(-limit, limit);
        self
    }

    #[must_use]
    pub fn feather_radius(mut self, radius: u32) -> Self {
        self.params.feather_radius = radius.min(MAX_FEATHER_RADIUS);
        self
    }

    #[must_use]
    pub fn morph_op(mut self, op: MorphOp) -> Self {
        self.params.morph_op = op;
        self
    }

    #[must_use]
    pub fn morph_iter(mut self, iterations: u32) -> Self {
        self.params.morph_iter = iterations.min(MAX_MORPH_ITERATIONS);
        self
    }

    #[must_use]
    pub fn decontamination_strength(mut self, strength: f32) -> Self {
        self.params.decontamination_strength = strength;
        self
    }

    /// Build the parameters, validating the non-clamped knobs
    pub fn build(self) -> Result<RefinementParameters> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl Default for RefinementParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for a refinement service session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Name given to the background worker thread
    pub worker_name: String,

    /// Orchestrator-level timeout per job (None = wait indefinitely)
    pub job_timeout: Option<Duration>,

    /// How long a timed-out job may take to acknowledge cancellation
    #[serde(default = "default_cancel_grace")]
    pub cancel_grace: Duration,

    /// Supersampling factor the input was rendered at (1 = no SSAA)
    pub ssaa_factor: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            worker_name: "matte-refine-worker".to_string(),
            job_timeout: None,
            cancel_grace: default_cancel_grace(),
            ssaa_factor: 1,
        }
    }
}

fn default_cancel_grace() -> Duration {
    DEFAULT_CANCEL_GRACE
}

impl ServiceConfig {
    /// Create a new service configuration builder
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_range(self.ssaa_factor, 1, MAX_SSAA_FACTOR, "SSAA factor")?;
        if self.worker_name.trim().is_empty() {
            return Err(crate::error::RefineError::invalid_config(
                "Worker name must not be empty",
            ));
        }
        if self.job_timeout.is_some_and(|t| t.is_zero()) {
            return Err(crate::error::RefineError::invalid_config(
                "Job timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Builder for `ServiceConfig`
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
        }
    }

    #[must_use]
    pub fn worker_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.worker_name = name.into();
        self
    }

    #[must_use]
    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.config.job_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancel_grace(mut self, grace: Duration) -> Self {
        self.config.cancel_grace = grace;
        self
    }

    #[must_use]
    pub fn ssaa_factor(mut self, factor: u32) -> Self {
        self.config.ssaa_factor = factor;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ServiceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
