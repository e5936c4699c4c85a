//! Error types for matte refinement operations

use std::time::Duration;
use thiserror::Error;

/// Result type alias for matte refinement operations
pub type Result<T> = std::result::Result<T, RefineError>;

/// Coarse error taxonomy reported to callers of the refinement engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input (buffer size, parameter ranges)
    Validation,
    /// Failure while a stage was running, including cancellation and timeouts
    Processing,
    /// Worker creation or channel communication failure
    Transport,
}

/// Comprehensive error types for matte refinement operations
#[derive(Error, Debug)]
pub enum RefineError {
    /// Malformed job input (buffer length, zero dimensions, out-of-range knobs)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure inside a pipeline stage
    #[error("Processing error: {0}")]
    Processing(String),

    /// Worker thread or channel failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Job was cancelled cooperatively
    #[error("job cancelled")]
    Cancelled,

    /// Job exceeded the orchestrator timeout
    #[error("job timed out after {0:?}")]
    Timeout(Duration),

    /// A job is already in flight on this worker
    #[error("worker busy: a refinement job is already in flight")]
    Busy,

    /// Invalid service or parameter configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Parameter file (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RefineError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!(
                "Failed to {} '{}': {}",
                operation,
                path.as_ref().display(),
                error
            ),
        ))
    }

    /// Buffer length does not match `width * height * 4`
    #[must_use]
    pub fn buffer_size_mismatch(expected: usize, actual: usize, width: u32, height: u32) -> Self {
        Self::Validation(format!(
            "imageData length {} does not match {}x{}x4 = {}",
            actual, width, height, expected
        ))
    }

    /// Create configuration error with valid range
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::Validation(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create processing error with stage context
    #[must_use]
    pub fn processing_stage_error(stage: &str, details: &str) -> Self {
        Self::Processing(format!(
            "Processing failed at stage '{}': {}",
            stage, details
        ))
    }

    /// Map onto the validation / processing / transport taxonomy
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidConfig(_) | Self::Serialization(_) => {
                ErrorKind::Validation
            },
            Self::Transport(_) | Self::Busy => ErrorKind::Transport,
            Self::Processing(_)
            | Self::Cancelled
            | Self::Timeout(_)
            | Self::Io(_)
            | Self::Image(_) => ErrorKind::Processing,
        }
    }
}
