//! Consolidated validation utilities
//!
//! Range, finiteness and buffer-size checks shared by the parameter
//! builder, the worker and the orchestrator.

pub mod numeric;

pub use numeric::NumericValidator;
