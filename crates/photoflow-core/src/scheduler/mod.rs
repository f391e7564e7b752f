//! Viewport scheduler: owns the registry and the two stage runners, and is
//! the single place where record state and artifacts are committed.
//!
//! Workers hand results back over a channel; `drain_completions` applies them
//! on the caller's (controlling) thread. Nothing outside this module mutates
//! the registry or a record, so the single-flight and single-writer
//! invariants hold by construction.

mod reconcile;

pub use reconcile::{plan, Reconciliation};

use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver};

use anyhow::Result;

use crate::config::PhotoflowConfig;
use crate::fetch::FetchLimits;
use crate::record::{Artifact, PhotoLibrary, RecordState};
use crate::registry::TaskRegistry;
use crate::runner::StageRunner;
use crate::stage::{StageInput, StageJob, StageKind, StageOutcome, TaskEvent, TaskKey};

/// The work-scheduling core: reconciles visible items against outstanding
/// tasks, suspends work while the viewport is in motion, and commits stage
/// outcomes back into the photo library.
#[derive(Debug)]
pub struct PhotoPipeline {
    registry: TaskRegistry,
    download_runner: StageRunner,
    filter_runner: StageRunner,
    events: Receiver<TaskEvent>,
    filter_intensity: f32,
    fetch_limits: FetchLimits,
}

impl PhotoPipeline {
    /// Spawn both stage runners. The pipeline is ready to reconcile.
    pub fn new(cfg: &PhotoflowConfig) -> Result<Self> {
        let (tx, events) = mpsc::channel();
        let download_runner = StageRunner::spawn("photoflow-download", tx.clone())?;
        let filter_runner = StageRunner::spawn("photoflow-filter", tx)?;
        Ok(Self {
            registry: TaskRegistry::new(),
            download_runner,
            filter_runner,
            events,
            filter_intensity: cfg.filter_intensity,
            fetch_limits: cfg.fetch_limits(),
        })
    }

    /// The viewport started moving: stop dequeuing on both runners. Tasks
    /// already running finish normally.
    pub fn motion_started(&self) {
        self.download_runner.suspend();
        self.filter_runner.suspend();
        tracing::debug!("runners suspended for viewport motion");
    }

    /// The viewport settled: resume the runners, commit anything that
    /// finished during the motion, and reconcile against the new visible
    /// set. Returns the indices whose display changed.
    pub fn motion_settled(
        &mut self,
        library: &mut PhotoLibrary,
        visible: &BTreeSet<usize>,
    ) -> Vec<usize> {
        self.download_runner.resume();
        self.filter_runner.resume();
        let changed = self.drain_completions(library);
        self.reconcile(library, visible);
        changed
    }

    /// Bring outstanding work in line with the visible set: cancel tasks for
    /// off-screen items, submit the wanted stage for uncovered visible items.
    /// A second call with the same visible set has no observable effect.
    pub fn reconcile(&mut self, library: &PhotoLibrary, visible: &BTreeSet<usize>) {
        let delta = reconcile::plan(&self.registry.outstanding(), visible, library);
        if delta.is_noop() {
            return;
        }
        tracing::debug!(
            cancel = delta.to_cancel.len(),
            start = delta.to_start.len(),
            "reconciling visible set"
        );
        for key in delta.to_cancel {
            self.registry.cancel_and_remove(key);
        }
        for key in delta.to_start {
            self.submit(library, key);
        }
    }

    /// Commit pending completions into the library. This is the only place
    /// record state/artifacts change. Returns the indices the UI should
    /// refresh; cancelled and superseded tasks clear silently.
    pub fn drain_completions(&mut self, library: &mut PhotoLibrary) -> Vec<usize> {
        let mut changed = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            // A false return means the slot was already cancelled-and-removed
            // or re-issued; the outcome is discarded either way.
            if !self.registry.complete(event.key, event.id) {
                continue;
            }
            if event.outcome.is_cancelled() {
                continue;
            }
            if self.apply(library, event.key, event.outcome) {
                changed.push(event.key.index);
            }
        }
        changed
    }

    /// Outstanding task keys, for callers that want to observe progress.
    pub fn outstanding(&self) -> BTreeSet<TaskKey> {
        self.registry.outstanding()
    }

    /// Jobs sitting in runner queues, not yet picked up.
    pub fn queued_jobs(&self) -> usize {
        self.download_runner.queued_len() + self.filter_runner.queued_len()
    }

    /// True when no task is outstanding anywhere.
    pub fn is_idle(&self) -> bool {
        self.registry.is_empty()
    }

    fn submit(&mut self, library: &PhotoLibrary, key: TaskKey) {
        let Some(record) = library.get(key.index) else {
            return;
        };
        let input = match (key.stage, record.state) {
            (StageKind::Download, RecordState::New) => StageInput::Download {
                url: record.url().clone(),
                limits: self.fetch_limits,
            },
            (StageKind::Filter, RecordState::Downloaded) => {
                let Some(image) = record.artifact.image() else {
                    tracing::warn!(index = key.index, "downloaded record has no image artifact");
                    return;
                };
                StageInput::Filter { image: image.clone(), intensity: self.filter_intensity }
            }
            _ => return,
        };
        let Some((id, cancel)) = self.registry.submit(key) else {
            return;
        };
        let job = StageJob { key, id, cancel, input };
        match key.stage {
            StageKind::Download => self.download_runner.enqueue(job),
            StageKind::Filter => self.filter_runner.enqueue(job),
        }
    }

    /// Apply one non-cancelled outcome. Returns true if the item's display
    /// may have changed. Preconditions are re-checked here; an outcome that
    /// no longer matches the record's state is dropped.
    fn apply(&mut self, library: &mut PhotoLibrary, key: TaskKey, outcome: StageOutcome) -> bool {
        let Some(record) = library.get_mut(key.index) else {
            return false;
        };
        match outcome {
            StageOutcome::Downloaded(img) => {
                if record.state != RecordState::New {
                    return false;
                }
                record.state = RecordState::Downloaded;
                record.artifact = Artifact::Image(img);
                true
            }
            StageOutcome::DownloadFailed => {
                if record.state != RecordState::New {
                    return false;
                }
                record.state = RecordState::Failed;
                record.artifact = Artifact::FailedPlaceholder;
                true
            }
            StageOutcome::Filtered(img) => {
                if record.state != RecordState::Downloaded {
                    return false;
                }
                record.state = RecordState::Filtered;
                record.artifact = Artifact::Image(img);
                true
            }
            // Filter could not run; record stays Downloaded, artifact kept.
            // The display still gets a refresh (spinner state).
            StageOutcome::FilterSkipped => record.state == RecordState::Downloaded,
            StageOutcome::Cancelled => false,
        }
    }
}
