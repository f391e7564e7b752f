//! Visible-set reconciliation: decide what to cancel and what to start.

use std::collections::BTreeSet;

use crate::record::{PhotoLibrary, RecordState};
use crate::stage::TaskKey;

/// The delta between outstanding work and the current visible set.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Outstanding tasks for items no longer on screen.
    pub to_cancel: Vec<TaskKey>,
    /// Tasks to submit for visible items with no outstanding work.
    pub to_start: Vec<TaskKey>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.to_cancel.is_empty() && self.to_start.is_empty()
    }
}

/// Compute the reconciliation delta.
///
/// Every outstanding key whose item is off-screen is cancelled. Every visible
/// item with no outstanding task gets the stage its state calls for: `New`
/// wants a download, `Downloaded` wants a filter, terminal states want
/// nothing. Indices beyond the library are ignored.
pub fn plan(
    outstanding: &BTreeSet<TaskKey>,
    visible: &BTreeSet<usize>,
    library: &PhotoLibrary,
) -> Reconciliation {
    let to_cancel = outstanding
        .iter()
        .filter(|key| !visible.contains(&key.index))
        .copied()
        .collect();

    let mut to_start = Vec::new();
    for &index in visible {
        let Some(record) = library.get(index) else {
            continue;
        };
        let wanted = match record.state {
            RecordState::New => TaskKey::download(index),
            RecordState::Downloaded => TaskKey::filter(index),
            RecordState::Filtered | RecordState::Failed => continue,
        };
        if !outstanding.contains(&wanted) {
            to_start.push(wanted);
        }
    }

    Reconciliation { to_cancel, to_start }
}
