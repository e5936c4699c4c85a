//! Terminal progress bar for single-job refinement

use crate::services::{JobSummary, ProcessingStage, ProgressReporter, ProgressUpdate};
use indicatif::{ProgressBar, ProgressStyle};

/// `ProgressReporter` drawing an `indicatif` bar from 0 to 100
pub struct IndicatifProgressReporter {
    bar: ProgressBar,
}

impl IndicatifProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }

    /// Reporter drawing into `bar`, mainly for hidden bars in tests
    #[must_use]
    pub fn with_bar(bar: ProgressBar) -> Self {
        bar.set_length(100);
        Self { bar }
    }
}

impl Default for IndicatifProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar.set_position(u64::from(update.progress));
        self.bar.set_message(update.description);
    }

    fn report_completion(&self, summary: &JobSummary) {
        self.bar.finish_with_message(format!(
            "{}x{} in {}ms",
            summary.output_dimensions.0, summary.output_dimensions.1, summary.total_ms
        ));
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.bar
            .abandon_with_message(format!("{} failed: {}", stage.description(), error));
    }
}
