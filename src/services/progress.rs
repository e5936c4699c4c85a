//! Progress reporting service
//!
//! This module separates progress reporting concerns from the pixel
//! pipeline, allowing different frontends to implement their own
//! progress handling.

use instant::Instant;

/// Stages of a refinement job, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStage {
    /// Keying pixels against the reference color
    ChromaKey,
    /// Tightening or loosening partially transparent edges
    EdgeChoke,
    /// Blurring the alpha channel
    Feather,
    /// Dilating or eroding the whole matte
    Morphology,
    /// Removing color spill from semi-transparent pixels
    Decontamination,
    /// Caller-side supersampled downsampling
    Supersampling,
    /// Job finished
    Completed,
}

impl ProcessingStage {
    /// Stages executed by the background worker, in order
    pub const WORKER_STAGES: [ProcessingStage; 5] = [
        ProcessingStage::ChromaKey,
        ProcessingStage::EdgeChoke,
        ProcessingStage::Feather,
        ProcessingStage::Morphology,
        ProcessingStage::Decontamination,
    ];

    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::ChromaKey => "Keying out chroma background",
            ProcessingStage::EdgeChoke => "Choking matte edges",
            ProcessingStage::Feather => "Feathering alpha channel",
            ProcessingStage::Morphology => "Applying morphology",
            ProcessingStage::Decontamination => "Removing color spill",
            ProcessingStage::Supersampling => "Downsampling supersampled result",
            ProcessingStage::Completed => "Refinement completed",
        }
    }

    /// Short stable name used in logs and error messages
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStage::ChromaKey => "chroma_key",
            ProcessingStage::EdgeChoke => "edge_choke",
            ProcessingStage::Feather => "feather",
            ProcessingStage::Morphology => "morphology",
            ProcessingStage::Decontamination => "decontamination",
            ProcessingStage::Supersampling => "supersampling",
            ProcessingStage::Completed => "completed",
        }
    }

    /// Slice of the 0-100 progress budget owned by this stage
    #[must_use]
    pub fn progress_range(&self) -> (u8, u8) {
        match self {
            ProcessingStage::ChromaKey => (0, 20),
            ProcessingStage::EdgeChoke => (20, 40),
            ProcessingStage::Feather => (40, 70),
            ProcessingStage::Morphology => (70, 85),
            ProcessingStage::Decontamination => (85, 95),
            ProcessingStage::Supersampling => (95, 100),
            ProcessingStage::Completed => (100, 100),
        }
    }

    /// Progress reached when this stage finishes
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        self.progress_range().1
    }

    /// Progress value after `fraction` (0.0-1.0) of this stage is done
    #[must_use]
    pub fn progress_at(&self, fraction: f32) -> u8 {
        let (start, end) = self.progress_range();
        let span = f32::from(end - start);
        start + (span * fraction.clamp(0.0, 1.0)).round() as u8
    }

    /// Stage that owns a raw progress value reported by the worker
    #[must_use]
    pub fn for_progress(progress: u8) -> Self {
        match progress {
            0..=20 => ProcessingStage::ChromaKey,
            21..=40 => ProcessingStage::EdgeChoke,
            41..=70 => ProcessingStage::Feather,
            71..=85 => ProcessingStage::Morphology,
            86..=95 => ProcessingStage::Decontamination,
            96..=99 => ProcessingStage::Supersampling,
            _ => ProcessingStage::Completed,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Current processing stage
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: String,
    /// Elapsed time since the job was dispatched (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    /// Create a new progress update
    #[must_use]
    pub fn new(stage: ProcessingStage, progress: u8, start_time: Instant) -> Self {
        Self {
            progress,
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
        }
    }
}

/// Summary handed to reporters when a job completes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    /// Wall-clock time from dispatch to final result (milliseconds)
    pub total_ms: u64,
    /// Dimensions of the buffer the worker refined
    pub refined_dimensions: (u32, u32),
    /// Dimensions of the final asset after SSAA
    pub output_dimensions: (u32, u32),
    /// Supersampling factor used
    pub ssaa_factor: u32,
}

/// Trait for reporting progress during refinement jobs
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report job completion
    fn report_completion(&self, summary: &JobSummary);

    /// Report an error during processing
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _summary: &JobSummary) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Console progress reporter that logs progress through the `log` facade
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to show elapsed time with every update
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, summary: &JobSummary) {
        log::info!("✅ Matte refinement completed in {}ms", summary.total_ms);

        if self.verbose {
            log::info!(
                "  • Refined at {}x{}",
                summary.refined_dimensions.0,
                summary.refined_dimensions.1
            );
            log::info!(
                "  • Output {}x{} (SSAA {}x)",
                summary.output_dimensions.0,
                summary.output_dimensions.1,
                summary.ssaa_factor
            );
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ Error during {}: {}", stage.description(), error);
    }
}

/// Progress tracker that keeps reported progress monotonic per job
pub struct ProgressTracker {
    reporter: Box<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
    last_progress: Option<u8>,
}

impl ProgressTracker {
    /// Create a new progress tracker with the specified reporter
    #[must_use]
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
            last_progress: None,
        }
    }

    /// Create a progress tracker with no-op reporter
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Box::new(NoOpProgressReporter))
    }

    /// Create a progress tracker with console reporter
    #[must_use]
    pub fn console(verbose: bool) -> Self {
        Self::new(Box::new(ConsoleProgressReporter::new(verbose)))
    }

    /// Reset timing and monotonicity state for a new job
    pub fn restart(&mut self) {
        self.start_time = Instant::now();
        self.current_stage = None;
        self.last_progress = None;
    }

    /// Report a raw progress value; values below the last one are dropped
    pub fn report_progress(&mut self, progress: u8) {
        let progress = progress.min(100);
        if self.last_progress.is_some_and(|last| progress <= last) {
            return;
        }
        let stage = ProcessingStage::for_progress(progress);
        self.last_progress = Some(progress);
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, progress, self.start_time));
    }

    /// Report that a stage has finished
    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.report_progress(stage.progress_percentage());
        self.current_stage = Some(stage);
    }

    /// Report completion
    pub fn report_completion(&self, summary: &JobSummary) {
        self.reporter.report_completion(summary);
    }

    /// Report an error at the current stage
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::ChromaKey);
        self.reporter.report_error(stage, error);
    }

    /// Get the elapsed time since tracking started
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Last progress value forwarded to the reporter
    #[must_use]
    pub fn last_progress(&self) -> Option<u8> {
        self.last_progress
    }

    /// Get the current processing stage
    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }
}
