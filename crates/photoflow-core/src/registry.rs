//! Single-flight task registry: at most one outstanding task per
//! `(item, stage)` key.
//!
//! Owned and mutated by the controller only. Workers never see the registry;
//! they report completion through the event channel, and the controller calls
//! `complete` with the event's task id. The id guard means a late completion
//! from a cancelled task can never evict a newer entry under the same key.

use std::collections::{BTreeSet, HashMap};

use crate::cancel::CancelToken;
use crate::stage::TaskKey;

#[derive(Debug)]
struct TaskHandle {
    id: u64,
    cancel: CancelToken,
}

/// Tracks outstanding tasks and hands out cancellation tokens.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    next_id: u64,
    entries: HashMap<TaskKey, TaskHandle>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot for `key`. Returns the task id and cancellation token
    /// to hand to the runner, or `None` if a task is already outstanding.
    pub fn submit(&mut self, key: TaskKey) -> Option<(u64, CancelToken)> {
        if self.entries.contains_key(&key) {
            return None;
        }
        self.next_id += 1;
        let handle = TaskHandle { id: self.next_id, cancel: CancelToken::new() };
        let token = handle.cancel.clone();
        let id = handle.id;
        self.entries.insert(key, handle);
        Some((id, token))
    }

    /// Clear the slot for `key` if it still belongs to task `id`.
    /// Returns true if the entry was removed (the completion is "live"),
    /// false for stale or already-cleared completions. Idempotent.
    pub fn complete(&mut self, key: TaskKey, id: u64) -> bool {
        match self.entries.get(&key) {
            Some(handle) if handle.id == id => {
                self.entries.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Request cancellation for `key` and clear the slot immediately.
    /// The running task keeps going until its next checkpoint; its eventual
    /// completion event will carry a stale id and be ignored.
    pub fn cancel_and_remove(&mut self, key: TaskKey) {
        if let Some(handle) = self.entries.remove(&key) {
            handle.cancel.cancel();
        }
    }

    /// Snapshot of all outstanding keys, for reconciliation.
    pub fn outstanding(&self) -> BTreeSet<TaskKey> {
        self.entries.keys().copied().collect()
    }

    pub fn contains(&self, key: TaskKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
