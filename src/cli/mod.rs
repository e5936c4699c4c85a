//! CLI module for the matte-refine binary
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;
mod progress;

pub use main_impl::{main, Cli, CliMorphOp, CliOutputFormat, CliPreset};
pub use progress::IndicatifProgressReporter;
