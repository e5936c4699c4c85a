//! Matte refinement pipeline
//!
//! Runs the five worker stages back-to-back on one buffer. Stage order is
//! fixed: later stages assume earlier ones already normalized alpha.

use crate::{
    config::RefinementParameters,
    error::{RefineError, Result},
    services::ProcessingStage,
    stages::{chroma_key, choke, decontaminate, feather, morphology},
    tracing_config::spans,
    types::PixelBuffer,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-job progress sink and cancellation state shared by all stages
pub struct JobContext<'a> {
    emit: Box<dyn FnMut(u8) + Send + 'a>,
    cancel: CancellationToken,
    last_progress: Option<u8>,
}

impl<'a> JobContext<'a> {
    /// Create a context forwarding progress values to `emit`
    pub fn new(emit: impl FnMut(u8) + Send + 'a, cancel: CancellationToken) -> Self {
        Self {
            emit: Box::new(emit),
            cancel,
            last_progress: None,
        }
    }

    /// Context that discards progress and is never cancelled
    #[must_use]
    pub fn detached() -> JobContext<'static> {
        JobContext::new(|_| {}, CancellationToken::new())
    }

    /// Report that `fraction` of `stage` is done; only increases are emitted
    pub fn report(&mut self, stage: ProcessingStage, fraction: f32) {
        let progress = stage.progress_at(fraction);
        if self.last_progress.is_some_and(|last| progress <= last) {
            return;
        }
        self.last_progress = Some(progress);
        (self.emit)(progress);
    }

    /// Report the end of `stage`
    pub fn finish_stage(&mut self, stage: ProcessingStage) {
        self.report(stage, 1.0);
    }

    /// Bail out if the job was cancelled
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RefineError::Cancelled);
        }
        Ok(())
    }

    /// Last progress value emitted
    #[must_use]
    pub fn last_progress(&self) -> Option<u8> {
        self.last_progress
    }
}

/// Refine `buffer` in place with every stage, in order
///
/// The first failing stage aborts the job; the buffer contents are then
/// unspecified and must not be returned to the caller.
pub fn run(
    buffer: &mut PixelBuffer,
    params: &RefinementParameters,
    ctx: &mut JobContext<'_>,
) -> Result<()> {
    params.validate()?;
    let dimensions = buffer.dimensions();

    for stage in ProcessingStage::WORKER_STAGES {
        ctx.checkpoint()?;
        let span = spans::stage(stage.name(), dimensions);
        let _enter = span.enter();
        let start = instant::Instant::now();

        match stage {
            ProcessingStage::ChromaKey => chroma_key::apply(
                buffer,
                params.target_chroma,
                params.chroma_tolerance,
                ctx,
            )?,
            ProcessingStage::EdgeChoke => {
                let (direction, iterations) = params.choke();
                choke::apply(buffer, direction, iterations, ctx)?;
            },
            ProcessingStage::Feather => feather::apply(buffer, params.feather_radius(), ctx)?,
            ProcessingStage::Morphology => morphology::apply(
                buffer,
                params.morph_op,
                params.morph_iterations(),
                ctx,
            )?,
            ProcessingStage::Decontamination => {
                decontaminate::apply(buffer, params.decontamination_strength, ctx)?;
            },
            ProcessingStage::Supersampling | ProcessingStage::Completed => {
                return Err(RefineError::processing_stage_error(
                    stage.name(),
                    "not a worker stage",
                ))
            },
        }

        ctx.finish_stage(stage);
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "stage finished"
        );
    }

    Ok(())
}

/// Run the pipeline synchronously on the current thread
///
/// Takes the buffer by value and hands it back only on success.
pub fn refine_blocking(
    mut buffer: PixelBuffer,
    params: &RefinementParameters,
) -> Result<PixelBuffer> {
    run(&mut buffer, params, &mut JobContext::detached())?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MorphOp;
    use std::sync::{Arc, Mutex};

    fn noisy_buffer(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for i in 0..width * height {
            data.extend_from_slice(&[
                (i * 37 % 256) as u8,
                (i * 91 % 256) as u8,
                (i * 13 % 256) as u8,
                (i * 53 % 256) as u8,
            ]);
        }
        PixelBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn test_context_only_emits_increases() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut ctx = JobContext::new(
            move |p| sink.lock().unwrap().push(p),
            CancellationToken::new(),
        );

        ctx.report(ProcessingStage::ChromaKey, 0.5);
        ctx.report(ProcessingStage::ChromaKey, 0.5);
        ctx.report(ProcessingStage::ChromaKey, 0.1);
        ctx.finish_stage(ProcessingStage::ChromaKey);
        ctx.finish_stage(ProcessingStage::EdgeChoke);

        assert_eq!(*seen.lock().unwrap(), vec![10, 20, 40]);
        assert_eq!(ctx.last_progress(), Some(40));
    }

    #[test]
    fn test_checkpoint_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = JobContext::new(|_| {}, token.clone());
        assert!(ctx.checkpoint().is_ok());
        token.cancel();
        assert!(matches!(ctx.checkpoint(), Err(RefineError::Cancelled)));
    }

    #[test]
    fn test_run_reports_every_stage_end() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut ctx = JobContext::new(
            move |p| sink.lock().unwrap().push(p),
            CancellationToken::new(),
        );
        let mut buffer = noisy_buffer(12, 9);
        let params = RefinementParameters::builder()
            .chroma_tolerance(40.0)
            .edge_choke(2)
            .feather_radius(2)
            .morph_iter(1)
            .decontamination_strength(50.0)
            .build()
            .unwrap();

        run(&mut buffer, &params, &mut ctx).unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        for stage in ProcessingStage::WORKER_STAGES {
            assert!(seen.contains(&stage.progress_percentage()), "{:?}", stage);
        }
        assert_eq!(seen.last(), Some(&95));
    }

    #[test]
    fn test_run_is_deterministic() {
        let params = RefinementParameters::builder()
            .chroma_tolerance(60.0)
            .edge_choke(-3)
            .feather_radius(20)
            .morph_op(MorphOp::Erode)
            .morph_iter(2)
            .decontamination_strength(80.0)
            .build()
            .unwrap();

        let a = refine_blocking(noisy_buffer(20, 17), &params).unwrap();
        let b = refine_blocking(noisy_buffer(20, 17), &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimensions(), (20, 17));
    }

    #[test]
    fn test_run_rejects_invalid_parameters() {
        let params = RefinementParameters {
            chroma_tolerance: f32::NAN,
            ..RefinementParameters::default()
        };
        let err = refine_blocking(noisy_buffer(4, 4), &params).unwrap_err();
        assert!(matches!(err, RefineError::Validation(_)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let mut ctx = JobContext::new(|_| {}, token);
        let mut buffer = noisy_buffer(4, 4);
        let err = run(&mut buffer, &RefinementParameters::default(), &mut ctx).unwrap_err();
        assert!(matches!(err, RefineError::Cancelled));
    }
}
