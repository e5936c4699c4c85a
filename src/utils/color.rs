//! Color parsing and conversion utilities

use crate::{config::ChromaColor, error::RefineError, error::Result};

/// Utility for parsing and converting key colors
pub struct ColorParser;

impl ColorParser {
    /// Parse a hex color string to a `ChromaColor`
    ///
    /// Supports both #RRGGBB and #RGB formats.
    ///
    /// # Examples
    /// ```rust
    /// use matte_refine::utils::ColorParser;
    ///
    /// let green = ColorParser::parse_hex("#00ff00").unwrap();
    /// let magenta = ColorParser::parse_hex("f0f").unwrap();
    /// assert_eq!((green.r, green.g, green.b), (0, 255, 0));
    /// assert_eq!((magenta.r, magenta.g, magenta.b), (255, 0, 255));
    /// ```
    pub fn parse_hex(hex: &str) -> Result<ChromaColor> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(RefineError::invalid_config(
                "Color must be in #RRGGBB or #RGB format",
            ));
        }

        let component = |s: &str, name: &str| {
            u8::from_str_radix(s, 16).map_err(|_| {
                RefineError::invalid_config(format!("Invalid {} component in hex color", name))
            })
        };

        match hex.len() {
            6 => Ok(ChromaColor::new(
                component(&hex[0..2], "red")?,
                component(&hex[2..4], "green")?,
                component(&hex[4..6], "blue")?,
            )),
            // #RGB expands each nibble to a full byte
            3 => Ok(ChromaColor::new(
                component(&hex[0..1], "red")? * 17,
                component(&hex[1..2], "green")? * 17,
                component(&hex[2..3], "blue")? * 17,
            )),
            _ => Err(RefineError::invalid_config(
                "Color must be in #RRGGBB or #RGB format",
            )),
        }
    }

    /// Convert a `ChromaColor` to a hex string
    #[must_use]
    pub fn to_hex(color: &ChromaColor, include_hash: bool) -> String {
        if include_hash {
            format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
        } else {
            format!("{:02x}{:02x}{:02x}", color.r, color.g, color.b)
        }
    }
}
