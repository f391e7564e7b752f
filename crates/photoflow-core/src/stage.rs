//! The two pipeline stages as pure job-to-outcome functions.
//!
//! A stage never touches the shared record list: its input is captured when
//! the task is submitted, and its outcome carries everything the controller
//! needs to commit the transition. Cancellation is polled at checkpoints;
//! a cancelled job reports `Cancelled` and mutates nothing.

use image::DynamicImage;
use url::Url;

use crate::cancel::CancelToken;
use crate::fetch::{self, FetchError, FetchLimits};
use crate::filter::{self, ToneOutcome};

/// Which stage a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Download,
    Filter,
}

/// Registry key: one task slot per item per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub index: usize,
    pub stage: StageKind,
}

impl TaskKey {
    pub fn download(index: usize) -> Self {
        Self { index, stage: StageKind::Download }
    }

    pub fn filter(index: usize) -> Self {
        Self { index, stage: StageKind::Filter }
    }
}

/// Stage input, captured at submission time.
#[derive(Debug)]
pub enum StageInput {
    Download { url: Url, limits: FetchLimits },
    Filter { image: DynamicImage, intensity: f32 },
}

/// One queued unit of work for a stage runner.
#[derive(Debug)]
pub struct StageJob {
    pub key: TaskKey,
    pub id: u64,
    pub cancel: CancelToken,
    pub input: StageInput,
}

/// What a finished task wants the controller to do with its record.
#[derive(Debug)]
pub enum StageOutcome {
    /// Download succeeded: commit `Downloaded` with the decoded image.
    Downloaded(DynamicImage),
    /// Download failed: commit `Failed` with the failure placeholder.
    DownloadFailed,
    /// Filter succeeded: commit `Filtered` with the transformed image.
    Filtered(DynamicImage),
    /// Filter could not run; the record stays `Downloaded`, untouched.
    FilterSkipped,
    /// Task was cancelled; commit nothing, notify nobody.
    Cancelled,
}

impl StageOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StageOutcome::Cancelled)
    }
}

/// Completion message posted by a runner back to the controller.
#[derive(Debug)]
pub struct TaskEvent {
    pub key: TaskKey,
    pub id: u64,
    pub outcome: StageOutcome,
}

/// Run one job to completion on the current (worker) thread.
pub fn run_job(job: StageJob) -> TaskEvent {
    let outcome = match job.input {
        StageInput::Download { url, limits } => run_download(&url, &limits, &job.cancel),
        StageInput::Filter { image, intensity } => {
            match filter::apply_sepia_tone(&image, intensity, &job.cancel) {
                ToneOutcome::Filtered(img) => StageOutcome::Filtered(img),
                ToneOutcome::Unavailable => StageOutcome::FilterSkipped,
                ToneOutcome::Cancelled => StageOutcome::Cancelled,
            }
        }
    };
    TaskEvent { key: job.key, id: job.id, outcome }
}

/// Fetch and decode one image. Cancellation is checked before the fetch and
/// again after it, so a task whose item scrolled away never commits bytes
/// into a repurposed slot.
fn run_download(url: &Url, limits: &FetchLimits, cancel: &CancelToken) -> StageOutcome {
    if cancel.is_cancelled() {
        return StageOutcome::Cancelled;
    }

    let bytes = match fetch::fetch_bytes(url, limits) {
        Ok(bytes) => bytes,
        Err(err) => {
            if cancel.is_cancelled() {
                return StageOutcome::Cancelled;
            }
            tracing::debug!(%url, error = %err, "download failed");
            return StageOutcome::DownloadFailed;
        }
    };

    if cancel.is_cancelled() {
        return StageOutcome::Cancelled;
    }

    match image::load_from_memory(&bytes) {
        Ok(img) => StageOutcome::Downloaded(img),
        Err(err) => {
            tracing::debug!(%url, error = %FetchError::Decode(err), "download failed");
            StageOutcome::DownloadFailed
        }
    }
}
