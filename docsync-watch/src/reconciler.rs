//! Ordered list reconciliation.
//!
//! Applies added / modified / removed events, one at a time and in delivery
//! order, to a caller-owned [`TrackedSequence`]. Each event's indices are
//! only meaningful against the state left by the events before it.
//!
//! Moves use the shift rule: an entry leaving `old_index` is re-inserted at
//! `new_index - 1` when `new_index > old_index` (the removal already
//! shortened the list), otherwise at `new_index`.
//!
//! Malformed events are rejected before anything is mutated. A rejected
//! event inside a batch leaves the earlier events of that batch applied;
//! there is no rollback.

use crate::config::{ReconcileConfig, UpdateMode};
use crate::error::{WatchError, WatchResult};
use crate::hooks::Hooks;
use docsync_types::{ChangeEvent, ChangeKind, Entry, TrackedSequence};
use serde_json::Value;
use tracing::{debug, trace};

/// What one event did to the sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// An entry was inserted, or (first-run dedupe) an existing entry was
    /// updated and moved. `index` is the event's `new_index`.
    Added {
        entry: Entry,
        index: usize,
        /// Position of the pre-existing entry when it was deduplicated.
        relocated_from: Option<usize>,
    },

    /// An entry was updated, possibly moving.
    Modified {
        entry: Entry,
        /// Entry before the update, when `capture_old_value` is set.
        previous: Option<Entry>,
        old_index: usize,
        new_index: usize,
    },

    /// An entry was removed.
    Removed { entry: Entry, old_index: usize },
}

impl Applied {
    /// Returns the kind of change that was applied.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Added { .. } => ChangeKind::Added,
            Self::Modified { .. } => ChangeKind::Modified,
            Self::Removed { .. } => ChangeKind::Removed,
        }
    }

    /// Returns the entry the change concerned.
    #[must_use]
    pub fn entry(&self) -> &Entry {
        match self {
            Self::Added { entry, .. } | Self::Modified { entry, .. } | Self::Removed { entry, .. } => {
                entry
            }
        }
    }
}

/// Keeps a [`TrackedSequence`] in step with a change feed.
///
/// One reconciler serves one subscription: it remembers whether the first
/// batch has been delivered yet.
#[derive(Debug)]
pub struct Reconciler {
    config: ReconcileConfig,
    hooks: Hooks,
    first_run: bool,
}

impl Reconciler {
    /// Creates a reconciler.
    #[must_use]
    pub fn new(config: ReconcileConfig, hooks: Hooks) -> Self {
        Self {
            config,
            hooks,
            first_run: true,
        }
    }

    /// Creates a reconciler without hooks.
    #[must_use]
    pub fn with_config(config: ReconcileConfig) -> Self {
        Self::new(config, Hooks::default())
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Returns true until the first batch has been delivered.
    #[must_use]
    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    /// Applies one event, then fires the matching hook.
    pub fn apply(&mut self, sequence: &mut TrackedSequence, event: &ChangeEvent) -> WatchResult<()> {
        let applied = self.mutate(sequence, event)?;
        self.notify(&applied);
        Ok(())
    }

    /// Applies one delivered batch in order and closes the first-run window.
    ///
    /// Stops at the first rejected event.
    pub fn apply_batch(
        &mut self,
        sequence: &mut TrackedSequence,
        events: &[ChangeEvent],
    ) -> WatchResult<()> {
        let result = events.iter().try_for_each(|event| self.apply(sequence, event));
        self.finish_batch();
        result
    }

    /// Marks the end of a delivered batch.
    pub fn finish_batch(&mut self) {
        if self.first_run {
            trace!("first batch delivered");
        }
        self.first_run = false;
    }

    /// Fires the hook for an applied change.
    ///
    /// Split from [`mutate`](Self::mutate) so a caller holding the sequence
    /// behind a lock can release it before hooks run.
    pub fn notify(&mut self, applied: &Applied) {
        self.hooks.fire(applied);
    }

    /// Reports an error through the `on_error` hook.
    pub fn report(&mut self, error: &WatchError) {
        self.hooks.fail(error);
    }

    /// Applies one event to `sequence` without firing hooks.
    pub fn mutate(&self, sequence: &mut TrackedSequence, event: &ChangeEvent) -> WatchResult<Applied> {
        let applied = match event {
            ChangeEvent::Added {
                id,
                value,
                new_index,
            } => self.apply_added(sequence, id, value, *new_index)?,
            ChangeEvent::Modified {
                id,
                value,
                old_index,
                new_index,
            } => self.apply_modified(sequence, id, value, *old_index, *new_index)?,
            ChangeEvent::Removed { id, old_index } => {
                Self::apply_removed(sequence, id, *old_index)?
            }
        };
        debug!(%event, len = sequence.len(), "applied change");
        Ok(applied)
    }

    fn apply_added(
        &self,
        sequence: &mut TrackedSequence,
        id: &str,
        value: &Value,
        new_index: usize,
    ) -> WatchResult<Applied> {
        let Some(current) = sequence.iter().position(|e| e.id == id) else {
            if new_index > sequence.len() {
                return Err(out_of_bounds(ChangeKind::Added, id, new_index, sequence.len()));
            }
            let entry = Entry::new(id, value.clone());
            sequence.insert(new_index, entry.clone());
            return Ok(Applied::Added {
                entry,
                index: new_index,
                relocated_from: None,
            });
        };

        if !(self.first_run && self.config.dedupe_first_run) {
            return Err(WatchError::DuplicateIdentifier {
                id: id.to_string(),
                index: current,
            });
        }

        let target = insertion_point(current, new_index);
        if target >= sequence.len() {
            return Err(out_of_bounds(ChangeKind::Added, id, new_index, sequence.len()));
        }

        write_value(&self.config, &mut sequence[current], value);
        if current != new_index {
            let entry = sequence.remove(current);
            sequence.insert(target, entry);
        }
        debug!(id, from = current, to = target, "deduplicated first-run entry");
        Ok(Applied::Added {
            entry: sequence[target].clone(),
            index: new_index,
            relocated_from: Some(current),
        })
    }

    fn apply_modified(
        &self,
        sequence: &mut TrackedSequence,
        id: &str,
        value: &Value,
        old_index: usize,
        new_index: usize,
    ) -> WatchResult<Applied> {
        check_entry(sequence, ChangeKind::Modified, id, old_index)?;

        if old_index == new_index {
            let previous = write_value(&self.config, &mut sequence[old_index], value);
            return Ok(Applied::Modified {
                entry: sequence[old_index].clone(),
                previous,
                old_index,
                new_index,
            });
        }

        let target = insertion_point(old_index, new_index);
        if target >= sequence.len() {
            return Err(out_of_bounds(ChangeKind::Modified, id, new_index, sequence.len()));
        }

        let mut entry = sequence.remove(old_index);
        let previous = write_value(&self.config, &mut entry, value);
        sequence.insert(target, entry);
        Ok(Applied::Modified {
            entry: sequence[target].clone(),
            previous,
            old_index,
            new_index,
        })
    }

    fn apply_removed(
        sequence: &mut TrackedSequence,
        id: &str,
        old_index: usize,
    ) -> WatchResult<Applied> {
        check_entry(sequence, ChangeKind::Removed, id, old_index)?;
        let entry = sequence.remove(old_index);
        Ok(Applied::Removed { entry, old_index })
    }
}

/// Applies one delivered batch to `sequence`.
///
/// Fails with [`WatchError::MissingTarget`] before touching anything when no
/// sequence is supplied.
pub fn bind(
    sequence: Option<&mut TrackedSequence>,
    events: &[ChangeEvent],
    reconciler: &mut Reconciler,
) -> WatchResult<()> {
    let sequence = sequence.ok_or(WatchError::MissingTarget { what: "sequence" })?;
    reconciler.apply_batch(sequence, events)
}

/// Where an entry leaving `from` lands for an event targeting `to`.
#[must_use]
pub fn insertion_point(from: usize, to: usize) -> usize {
    if to > from { to - 1 } else { to }
}

/// Writes `value` onto `entry` according to the update mode and returns the
/// previous entry when `capture_old_value` is set.
pub(crate) fn write_value(config: &ReconcileConfig, entry: &mut Entry, value: &Value) -> Option<Entry> {
    let previous = match config.update_mode {
        UpdateMode::Replace => {
            let old = std::mem::replace(&mut entry.data, value.clone());
            config.capture_old_value.then(|| Entry {
                id: entry.id.clone(),
                data: old,
                exists: entry.exists,
            })
        }
        UpdateMode::Merge => {
            let previous = config.capture_old_value.then(|| entry.clone());
            let stats = docsync_merge::merge(&mut entry.data, value);
            trace!(id = %entry.id, writes = stats.writes, removals = stats.removals, "merged value");
            previous
        }
    };
    entry.exists = true;
    previous
}

fn check_entry(
    sequence: &TrackedSequence,
    kind: ChangeKind,
    id: &str,
    index: usize,
) -> WatchResult<()> {
    let Some(entry) = sequence.get(index) else {
        return Err(out_of_bounds(kind, id, index, sequence.len()));
    };
    if entry.id != id {
        return Err(WatchError::IdentifierMismatch {
            kind,
            expected: id.to_string(),
            found: entry.id.clone(),
            index,
        });
    }
    Ok(())
}

fn out_of_bounds(kind: ChangeKind, id: &str, index: usize, len: usize) -> WatchError {
    WatchError::IndexOutOfBounds {
        kind,
        id: id.to_string(),
        index,
        len,
    }
}
