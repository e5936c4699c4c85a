//! Numeric validation utilities
//!
//! Provides overflow-checked buffer sizing and range validation for job
//! inputs and refinement knobs.

use crate::error::{RefineError, Result};

/// Validator for numeric operations and conversions
pub struct NumericValidator;

impl NumericValidator {
    /// Compute `width * height * 4` without overflowing `usize`
    pub fn rgba_len(width: u32, height: u32) -> Result<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| {
                RefineError::validation(format!(
                    "Buffer size overflow for {}x{} RGBA image",
                    width, height
                ))
            })
    }

    /// Validate that an RGBA byte buffer matches its declared dimensions
    pub fn validate_rgba_buffer(len: usize, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(RefineError::validation(format!(
                "Image dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }

        let expected = Self::rgba_len(width, height)?;
        if len != expected {
            return Err(RefineError::buffer_size_mismatch(expected, len, width, height));
        }
        Ok(())
    }

    /// Validate that a float is finite and non-negative
    pub fn validate_non_negative(value: f32, name: &str) -> Result<f32> {
        if !value.is_finite() {
            return Err(RefineError::validation(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }

        if value < 0.0 {
            return Err(RefineError::config_value_error(name, value, ">= 0"));
        }

        Ok(value)
    }

    /// Validate a percentage value (0.0 to 100.0)
    pub fn validate_percent(value: f32, name: &str) -> Result<f32> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(RefineError::config_value_error(name, value, "0-100"));
        }
        Ok(value)
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(RefineError::invalid_config(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }
}
