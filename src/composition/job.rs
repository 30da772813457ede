//! Export jobs: request, status, cancellation and completion delivery.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

use crate::composition::engine::CompositionEngine;
use crate::error::{ImportError, MergeError, Result};
use crate::library::LibraryImporter;
use crate::overlay::TextParts;
use crate::timing::Rational;
use crate::video::backend::MediaBackend;
use crate::video::types::FrameSize;

/// Status text published when a job is accepted
pub const MSG_REQUESTED: &str = "Merged video export is requested";

/// Status text published once validation has passed
pub const MSG_STARTING: &str = "Export is going to be created…";

/// Everything needed to run one export
#[derive(Clone)]
pub struct ExportRequest {
    pub first: Option<PathBuf>,
    pub second: Option<PathBuf>,

    /// Output file path
    pub output: PathBuf,

    /// Name-card text; `None` uses the engine's configured text
    pub text_parts: Option<TextParts>,

    /// Where a finished export is copied, if anywhere
    pub library: Option<Arc<dyn LibraryImporter>>,
}

impl ExportRequest {
    pub fn new(
        first: impl Into<PathBuf>,
        second: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            first: Some(first.into()),
            second: Some(second.into()),
            output: output.into(),
            text_parts: None,
            library: None,
        }
    }

    pub fn with_text_parts(mut self, text_parts: TextParts) -> Self {
        self.text_parts = Some(text_parts);
        self
    }

    pub fn with_library(mut self, library: Arc<dyn LibraryImporter>) -> Self {
        self.library = Some(library);
        self
    }
}

impl fmt::Debug for ExportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportRequest")
            .field("first", &self.first)
            .field("second", &self.second)
            .field("output", &self.output)
            .field("text_parts", &self.text_parts)
            .field("library", &self.library.as_ref().map(|l| l.location().to_path_buf()))
            .finish()
    }
}

/// Lifecycle of an export job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed { reason: String },
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

/// Snapshot published on the status channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    pub message: String,
    pub frames_rendered: u64,
    pub total_frames: u64,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self {
            state: JobState::Pending,
            message: MSG_REQUESTED.to_string(),
            frames_rendered: 0,
            total_frames: 0,
        }
    }

    /// Fraction of frames rendered, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        if self.total_frames == 0 {
            0.0
        } else {
            self.frames_rendered as f64 / self.total_frames as f64
        }
    }
}

/// What a successful export produced
#[derive(Debug)]
pub struct ExportOutcome {
    pub output: PathBuf,
    pub size: FrameSize,
    pub frames: u64,
    pub duration: Rational,

    /// Result of the library import, when one was requested
    pub import: Option<std::result::Result<PathBuf, ImportError>>,
}

pub type ExportResult = Result<ExportOutcome>;

/// Cooperative cancellation flag checked by the worker between frames
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Worker side of the status channel
#[derive(Debug)]
pub struct StatusSender {
    tx: watch::Sender<JobStatus>,
}

impl StatusSender {
    pub fn channel() -> (Self, watch::Receiver<JobStatus>) {
        let (tx, rx) = watch::channel(JobStatus::pending());
        (Self { tx }, rx)
    }

    /// A sender nobody listens to
    pub fn detached() -> Self {
        Self::channel().0
    }

    pub fn current(&self) -> JobStatus {
        self.tx.borrow().clone()
    }

    pub fn requested(&self) {
        self.tx.send_modify(|status| *status = JobStatus::pending());
    }

    pub fn running(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|status| {
            status.state = JobState::Running;
            status.message = message;
        });
    }

    pub fn progress(&self, frames_rendered: u64, total_frames: u64) {
        self.tx.send_modify(|status| {
            status.frames_rendered = frames_rendered;
            status.total_frames = total_frames;
        });
    }

    pub fn completed(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|status| {
            status.state = JobState::Completed;
            status.message = message;
        });
    }

    pub fn failed(&self, error: &MergeError) {
        let message = error.user_message();
        self.tx.send_modify(|status| {
            status.state = JobState::Failed {
                reason: error.to_string(),
            };
            status.message = message;
        });
    }
}

/// Starts exports on a blocking worker thread
#[derive(Clone)]
pub struct ExportSession {
    engine: Arc<CompositionEngine>,
    backend: Arc<dyn MediaBackend>,
}

impl ExportSession {
    pub fn new(engine: CompositionEngine, backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            engine: Arc::new(engine),
            backend,
        }
    }

    /// Launch `request` on the worker and return its handle
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, request: ExportRequest) -> ExportHandle {
        let cancel = CancelToken::new();
        let (status_tx, status_rx) = StatusSender::channel();
        let (result_tx, result_rx) = oneshot::channel();

        let engine = Arc::clone(&self.engine);
        let backend = Arc::clone(&self.backend);
        let worker_cancel = cancel.clone();

        debug!("Starting export worker for {:?}", request.output);
        tokio::task::spawn_blocking(move || {
            let result = engine.export(&request, backend.as_ref(), &worker_cancel, &status_tx);
            if result_tx.send(result).is_err() {
                debug!("Export handle dropped before completion");
            }
        });

        ExportHandle {
            cancel,
            status: status_rx,
            result: result_rx,
        }
    }
}

/// Caller side of a running export
#[derive(Debug)]
pub struct ExportHandle {
    cancel: CancelToken,
    status: watch::Receiver<JobStatus>,
    result: oneshot::Receiver<ExportResult>,
}

impl ExportHandle {
    /// Ask the worker to stop after the current frame
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn status(&self) -> watch::Receiver<JobStatus> {
        self.status.clone()
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> ExportResult {
        match self.result.await {
            Ok(result) => result,
            Err(_) => {
                warn!("Export worker stopped without reporting a result");
                Err(MergeError::generic("Export worker stopped unexpectedly"))
            }
        }
    }

    /// Wait for the job, then hand the result to `callback` on this task
    pub async fn on_complete<F, T>(self, callback: F) -> T
    where
        F: FnOnce(ExportResult) -> T,
    {
        callback(self.wait().await)
    }
}

/// Run an export on the current thread
pub fn export_blocking(
    engine: &CompositionEngine,
    backend: &dyn MediaBackend,
    request: &ExportRequest,
) -> ExportResult {
    engine.export(request, backend, &CancelToken::new(), &StatusSender::detached())
}

/// Default file name of an export started at `now`
///
/// The time separator is `.` so the name is valid on every file system.
pub fn output_file_name(now: DateTime<Local>) -> String {
    format!("mergeVideo-{}.mov", now.format("%B %-d, %Y at %H.%M"))
}

/// Use `output` as-is, or place a timestamped name inside it when it is a directory
pub fn resolve_output_path(output: &Path, now: DateTime<Local>) -> PathBuf {
    if output.is_dir() {
        output.join(output_file_name(now))
    } else {
        output.to_path_buf()
    }
}
