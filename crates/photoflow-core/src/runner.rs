//! Stage runners: one worker thread per stage, FIFO queue, suspend/resume.
//!
//! Concurrency is fixed at one task in flight per runner, so tasks execute
//! strictly in submission order and at most one download and one filter run
//! at any time system-wide. `suspend` gates dequeuing only; a task already
//! running continues to completion. Every completed task (including
//! cancelled ones) posts a `TaskEvent` back to the controller's channel;
//! the controller decides what is committed and what stays silent.

use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::stage::{self, StageJob, TaskEvent};

#[derive(Debug, Default)]
struct RunnerState {
    queue: VecDeque<StageJob>,
    suspended: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct RunnerShared {
    state: Mutex<RunnerState>,
    wake: Condvar,
}

/// A bounded-concurrency (= 1) executor for one stage kind.
#[derive(Debug)]
pub struct StageRunner {
    shared: Arc<RunnerShared>,
    worker: Option<JoinHandle<()>>,
}

impl StageRunner {
    /// Spawn the worker thread. `name` labels the thread for logs/backtraces;
    /// `events` receives one `TaskEvent` per executed job.
    pub fn spawn(name: &str, events: Sender<TaskEvent>) -> Result<Self> {
        let shared = Arc::new(RunnerShared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(worker_shared, events))
            .with_context(|| format!("spawn {} worker", name))?;
        Ok(Self { shared, worker: Some(worker) })
    }

    /// Append a job to the FIFO queue.
    pub fn enqueue(&self, job: StageJob) {
        let mut state = self.shared.state.lock().unwrap();
        state.queue.push_back(job);
        drop(state);
        self.shared.wake.notify_all();
    }

    /// Stop dequeuing. The currently running job, if any, finishes normally.
    pub fn suspend(&self) {
        self.shared.state.lock().unwrap().suspended = true;
    }

    /// Allow dequeuing again.
    pub fn resume(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.suspended = false;
        drop(state);
        self.shared.wake.notify_all();
    }

    /// Number of jobs queued but not yet picked up by the worker.
    pub fn queued_len(&self) -> usize {
        self.shared.state.lock().unwrap().queue.len()
    }
}

impl Drop for StageRunner {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.shutdown = true;
        }
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<RunnerShared>, events: Sender<TaskEvent>) {
    loop {
        let job = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if state.shutdown {
                    return;
                }
                if !state.suspended {
                    if let Some(job) = state.queue.pop_front() {
                        break job;
                    }
                }
                state = shared.wake.wait(state).unwrap();
            }
        };

        let key = job.key;
        let event = stage::run_job(job);
        tracing::trace!(?key, cancelled = event.outcome.is_cancelled(), "task finished");

        // Controller gone; nothing left to report to.
        if events.send(event).is_err() {
            return;
        }
    }
}
