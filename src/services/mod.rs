//! Service layer
//!
//! Progress reporting and image I/O, kept apart from the pixel pipeline so
//! that frontends can plug in their own handling.

pub mod io;
pub mod progress;

pub use io::ImageIOService;
pub use progress::{
    ConsoleProgressReporter, JobSummary, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
