//! Refinement service
//!
//! `RefinementService` owns one background worker for its whole lifetime and
//! is the only way callers reach it. Jobs are dispatched one at a time: the
//! buffer moves to the worker on dispatch and comes back with the terminal
//! event. SSAA finalization runs here, on the caller side, after the worker
//! has reported 95%.

use crate::{
    config::{RefinementParameters, ServiceConfig},
    error::{RefineError, Result},
    services::{JobSummary, ProcessingStage, ProgressTracker},
    ssaa,
    types::PixelBuffer,
    worker::{JobEnvelope, JobEvent, RefinementWorker, WorkerRequest},
};
use instant::Instant;
use log::debug;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info as trace_info, instrument, warn};

/// Output of a finished refinement
#[derive(Debug, Clone)]
pub struct RefinementResult {
    /// Final image, already downsampled when SSAA is enabled
    pub image: PixelBuffer,
    /// Wall time from dispatch to finalization
    pub elapsed_ms: u64,
    /// Factor the worker output was reduced by
    pub ssaa_factor: u32,
}

/// Handle to a job in flight
///
/// Yields the job's events in order and ends after the single terminal
/// event. Dropping an unfinished handle cancels the job.
#[derive(Debug)]
pub struct RefinementJob {
    events: mpsc::UnboundedReceiver<JobEvent>,
    cancel: CancellationToken,
    finished: bool,
}

impl RefinementJob {
    /// Next event of this job, `None` once the terminal event was delivered
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        if self.finished {
            return None;
        }
        let event = match self.events.recv().await {
            Some(event) => event,
            None => JobEvent::Failed(RefineError::transport(
                "worker stopped before the job finished",
            )),
        };
        if event.is_terminal() {
            self.finished = true;
        }
        Some(event)
    }

    /// Ask the worker to abandon this job at its next checkpoint
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the terminal event has been delivered
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Forward progress to `tracker` until the job ends
    pub async fn wait(&mut self, tracker: &mut ProgressTracker) -> Result<PixelBuffer> {
        while let Some(event) = self.next_event().await {
            match event {
                JobEvent::Progress(progress) => tracker.report_progress(progress),
                JobEvent::Complete(buffer) => return Ok(buffer),
                JobEvent::Failed(error) => return Err(error),
            }
        }
        Err(RefineError::transport("job result was already consumed"))
    }

    /// Discard events up to and including the terminal one
    async fn drain(&mut self) {
        while self.next_event().await.is_some() {}
    }
}

impl Drop for RefinementJob {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.cancel();
        }
    }
}

/// Long-lived refinement service with a dedicated worker thread
pub struct RefinementService {
    config: ServiceConfig,
    worker: RefinementWorker,
    session: CancellationToken,
    busy: Arc<AtomicBool>,
}

impl RefinementService {
    /// Validate `config` and start the worker thread
    pub fn create(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let worker = RefinementWorker::spawn(&config.worker_name)?;
        debug!("Refinement service '{}' created", config.worker_name);

        Ok(Self {
            config,
            worker,
            session: CancellationToken::new(),
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Cancel any job in flight and join the worker thread
    pub fn destroy(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.session.cancel();
        self.worker.shutdown()
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Whether a job is currently in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Hand `buffer` to the worker and return a handle to the job
    ///
    /// Fails with [`RefineError::Busy`] while another job is in flight.
    pub fn dispatch(
        &self,
        buffer: PixelBuffer,
        params: RefinementParameters,
    ) -> Result<RefinementJob> {
        self.dispatch_request(WorkerRequest::process(buffer, params))
    }

    /// Dispatch a raw protocol request
    ///
    /// Input is validated on the worker, so a malformed request still
    /// produces a job whose only event is an error.
    pub fn dispatch_request(&self, request: WorkerRequest) -> Result<RefinementJob> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RefineError::Busy);
        }

        let (events, receiver) = mpsc::unbounded_channel();
        let cancel = self.session.child_token();
        let envelope = JobEnvelope {
            request,
            events,
            cancel: cancel.clone(),
            busy: self.busy.clone(),
        };

        if let Err(e) = self.worker.submit(envelope) {
            self.busy.store(false, Ordering::Release);
            return Err(e);
        }

        Ok(RefinementJob {
            events: receiver,
            cancel,
            finished: false,
        })
    }

    /// Run one job end to end, including SSAA finalization
    ///
    /// `buffer` must be rendered at `ssaa_factor` times the target
    /// resolution. Progress goes to `tracker` and ends at 100.
    ///
    /// On timeout the job is cancelled and awaited for at most
    /// `cancel_grace` before [`RefineError::Timeout`] is returned.
    #[instrument(
        skip(self, buffer, params, tracker),
        fields(
            worker = %self.config.worker_name,
            dimensions = %format!("{}x{}", buffer.width(), buffer.height()),
            ssaa = self.config.ssaa_factor
        )
    )]
    pub async fn refine(
        &self,
        buffer: PixelBuffer,
        params: RefinementParameters,
        tracker: &mut ProgressTracker,
    ) -> Result<RefinementResult> {
        let start = Instant::now();
        let factor = self.config.ssaa_factor;
        let refined_dimensions = buffer.dimensions();
        ssaa::validate_factor(refined_dimensions.0, refined_dimensions.1, factor)?;
        tracker.restart();

        let mut job = self.dispatch(buffer, params)?;
        let outcome = match self.config.job_timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, job.wait(tracker)).await;
                match waited {
                    Ok(result) => result,
                    Err(_) => {
                        job.cancel();
                        let grace = self.config.cancel_grace;
                        if tokio::time::timeout(grace, job.drain()).await.is_err() {
                            // The worker stays busy until it reaches its next checkpoint
                            warn!(
                                grace_ms = grace.as_millis() as u64,
                                "cancelled job did not stop within the grace period"
                            );
                        }
                        warn!(timeout_ms = limit.as_millis() as u64, "refinement timed out");
                        Err(RefineError::Timeout(limit))
                    },
                }
            },
            None => job.wait(tracker).await,
        };

        let refined = match outcome {
            Ok(buffer) => buffer,
            Err(e) => {
                tracker.report_error(&e.to_string());
                return Err(e);
            },
        };

        let image = match ssaa::downsample(refined, factor) {
            Ok(image) => image,
            Err(e) => {
                tracker.report_error(&e.to_string());
                return Err(e);
            },
        };
        tracker.report_stage(ProcessingStage::Supersampling);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracker.report_completion(&JobSummary {
            total_ms: elapsed_ms,
            refined_dimensions,
            output_dimensions: image.dimensions(),
            ssaa_factor: factor,
        });
        trace_info!(elapsed_ms, "refinement finished");

        Ok(RefinementResult {
            image,
            elapsed_ms,
            ssaa_factor: factor,
        })
    }
}

impl Drop for RefinementService {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "refinement service did not shut down cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> RefinementService {
        RefinementService::create(ServiceConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_config() {
        let config = ServiceConfig {
            ssaa_factor: 9,
            ..ServiceConfig::default()
        };
        assert!(RefinementService::create(config).is_err());
    }

    #[tokio::test]
    async fn test_neutral_job_round_trips_buffer() {
        let service = service();
        let data: Vec<u8> = (0..64).map(|i| (i * 3) as u8).collect();
        let buffer = PixelBuffer::new(4, 4, data.clone()).unwrap();

        let mut job = service
            .dispatch(buffer, RefinementParameters::default())
            .unwrap();
        let out = job.wait(&mut ProgressTracker::no_op()).await.unwrap();
        assert_eq!(out.as_bytes(), data.as_slice());
        assert!(job.next_event().await.is_none());
        assert!(!service.is_busy());
    }

    #[tokio::test]
    async fn test_second_dispatch_is_busy() {
        let service = service();
        let big = PixelBuffer::filled(256, 256, [0, 200, 0, 255]).unwrap();
        let params = RefinementParameters::builder()
            .feather_radius(30)
            .morph_iter(10)
            .build()
            .unwrap();

        let mut first = service.dispatch(big, params.clone()).unwrap();
        let second = service.dispatch(PixelBuffer::filled(1, 1, [0; 4]).unwrap(), params);
        assert!(matches!(second, Err(RefineError::Busy)));

        first.wait(&mut ProgressTracker::no_op()).await.unwrap();
        assert!(!service.is_busy());
    }

    #[tokio::test]
    async fn test_refine_reaches_one_hundred() {
        let service = RefinementService::create(
            ServiceConfig::builder().ssaa_factor(2).build().unwrap(),
        )
        .unwrap();
        let mut tracker = ProgressTracker::no_op();
        let buffer = PixelBuffer::filled(8, 6, [1, 2, 3, 255]).unwrap();

        let result = service
            .refine(buffer, RefinementParameters::default(), &mut tracker)
            .await
            .unwrap();
        assert_eq!(result.image.dimensions(), (4, 3));
        assert_eq!(result.ssaa_factor, 2);
        assert_eq!(tracker.last_progress(), Some(100));
    }

    #[tokio::test]
    async fn test_refine_rejects_indivisible_ssaa_before_dispatch() {
        let service = RefinementService::create(
            ServiceConfig::builder().ssaa_factor(3).build().unwrap(),
        )
        .unwrap();
        let buffer = PixelBuffer::filled(4, 4, [0; 4]).unwrap();
        let err = service
            .refine(buffer, RefinementParameters::default(), &mut ProgressTracker::no_op())
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::Validation(_)));
        assert!(!service.is_busy());
    }

    #[tokio::test]
    async fn test_destroy_joins_worker() {
        let service = service();
        service.destroy().unwrap();
    }
}
