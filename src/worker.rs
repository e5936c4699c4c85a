//! Background refinement worker
//!
//! One dedicated OS thread per service runs jobs strictly one at a time. The
//! caller talks to it with [`WorkerRequest`]s and gets back an ordered stream
//! of [`JobEvent`]s: zero or more progress values, then exactly one terminal
//! event.

use crate::{
    config::RefinementParameters,
    error::{RefineError, Result},
    pipeline::{self, JobContext},
    types::PixelBuffer,
};
use serde::{Deserialize, Serialize};
use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn};

/// Caller to worker message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    Process {
        #[serde(rename = "imageData")]
        image_data: Vec<u8>,
        width: u32,
        height: u32,
        params: RefinementParameters,
    },
}

impl WorkerRequest {
    /// Build a process request, moving the pixel storage out of `buffer`
    #[must_use]
    pub fn process(buffer: PixelBuffer, params: RefinementParameters) -> Self {
        let (width, height) = buffer.dimensions();
        WorkerRequest::Process {
            image_data: buffer.into_raw(),
            width,
            height,
            params,
        }
    }
}

/// Worker to caller message, as serialized on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    Progress {
        progress: u8,
    },
    Complete {
        #[serde(rename = "imageData")]
        image_data: Vec<u8>,
    },
    Error {
        error: String,
    },
}

impl WorkerMessage {
    /// Whether this message ends the job
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerMessage::Progress { .. })
    }
}

/// Typed job event delivered to in-process callers
#[derive(Debug)]
pub enum JobEvent {
    Progress(u8),
    Complete(PixelBuffer),
    Failed(RefineError),
}

impl JobEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress(_))
    }

    /// Convert into the wire form
    #[must_use]
    pub fn into_message(self) -> WorkerMessage {
        match self {
            JobEvent::Progress(progress) => WorkerMessage::Progress { progress },
            JobEvent::Complete(buffer) => WorkerMessage::Complete {
                image_data: buffer.into_raw(),
            },
            JobEvent::Failed(error) => WorkerMessage::Error {
                error: error.to_string(),
            },
        }
    }
}

impl From<JobEvent> for WorkerMessage {
    fn from(event: JobEvent) -> Self {
        event.into_message()
    }
}

/// Everything the worker thread needs to run and answer one job
pub(crate) struct JobEnvelope {
    pub(crate) request: WorkerRequest,
    pub(crate) events: mpsc::UnboundedSender<JobEvent>,
    pub(crate) cancel: CancellationToken,
    pub(crate) busy: Arc<AtomicBool>,
}

/// Handle to the worker thread
pub(crate) struct RefinementWorker {
    name: String,
    commands: Option<mpsc::UnboundedSender<JobEnvelope>>,
    handle: Option<JoinHandle<()>>,
}

impl RefinementWorker {
    /// Spawn the worker thread
    pub(crate) fn spawn(name: &str) -> Result<Self> {
        let (commands, receiver) = mpsc::unbounded_channel::<JobEnvelope>();

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(receiver))
            .map_err(|e| {
                RefineError::transport(format!("Failed to spawn worker thread: {}", e))
            })?;

        debug!(worker = %name, "refinement worker started");
        Ok(Self {
            name: name.to_string(),
            commands: Some(commands),
            handle: Some(handle),
        })
    }

    /// Queue a job on the worker thread
    pub(crate) fn submit(&self, job: JobEnvelope) -> Result<()> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| RefineError::transport("worker has been shut down"))?;
        commands
            .send(job)
            .map_err(|_| RefineError::transport(format!("worker '{}' is not running", self.name)))
    }

    /// Close the command channel and join the thread
    ///
    /// Jobs still queued run to their terminal event first. Calling this more
    /// than once is a no-op.
    pub(crate) fn shutdown(&mut self) -> Result<()> {
        self.commands.take();
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        handle.join().map_err(|_| {
            RefineError::transport(format!("worker '{}' panicked during shutdown", self.name))
        })?;
        debug!(worker = %self.name, "refinement worker stopped");
        Ok(())
    }
}

impl Drop for RefinementWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "refinement worker did not shut down cleanly");
        }
    }
}

fn worker_loop(mut receiver: mpsc::UnboundedReceiver<JobEnvelope>) {
    while let Some(job) = receiver.blocking_recv() {
        handle_job(job);
    }
}

fn handle_job(job: JobEnvelope) {
    let JobEnvelope {
        request,
        events,
        cancel,
        busy,
    } = job;

    let progress_events = events.clone();
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        run_request(request, cancel, progress_events)
    }));

    let terminal = match outcome {
        Ok(Ok(buffer)) => JobEvent::Complete(buffer),
        Ok(Err(error)) => JobEvent::Failed(error),
        Err(payload) => JobEvent::Failed(RefineError::processing(panic_message(payload.as_ref()))),
    };

    // Idle before the caller can observe the terminal event
    busy.store(false, Ordering::Release);
    if events.send(terminal).is_err() {
        debug!("job finished after its caller went away");
    }
}

fn run_request(
    request: WorkerRequest,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<JobEvent>,
) -> Result<PixelBuffer> {
    let WorkerRequest::Process {
        image_data,
        width,
        height,
        params,
    } = request;

    let span = info_span!("job", width, height);
    let _enter = span.enter();

    let mut buffer = PixelBuffer::new(width, height, image_data)?;
    let mut ctx = JobContext::new(
        move |progress| {
            let _ = events.send(JobEvent::Progress(progress));
        },
        cancel,
    );
    pipeline::run(&mut buffer, &params, &mut ctx)?;
    Ok(buffer)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("worker panicked: {}", detail)
}
