//! Single-document binding.
//!
//! A document feed delivers the whole document (or its absence) on every
//! change. The binding compares that against the caller's slot to decide
//! whether the document was added, modified or removed.

use crate::config::ReconcileConfig;
use crate::hooks::Hooks;
use crate::reconciler::{write_value, Applied};
use docsync_types::Entry;
use serde_json::Value;
use tracing::debug;

/// Keeps one [`Entry`] in step with a document feed.
#[derive(Debug)]
pub struct DocumentBinding {
    id: String,
    config: ReconcileConfig,
    hooks: Hooks,
}

impl DocumentBinding {
    /// Creates a binding for the document `id`.
    #[must_use]
    pub fn new(id: impl Into<String>, config: ReconcileConfig, hooks: Hooks) -> Self {
        Self {
            id: id.into(),
            config,
            hooks,
        }
    }

    /// Returns the bound document's identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Applies a snapshot to `slot`, then fires the matching hook.
    pub fn apply_snapshot(&mut self, slot: &mut Entry, snapshot: Option<Value>) -> Option<Applied> {
        let applied = self.mutate(slot, snapshot)?;
        self.notify(&applied);
        Some(applied)
    }

    /// Fires the hook for an applied change.
    pub fn notify(&mut self, applied: &Applied) {
        self.hooks.fire(applied);
    }

    /// Reports an error through the `on_error` hook.
    pub fn report(&mut self, error: &crate::WatchError) {
        self.hooks.fail(error);
    }

    /// Applies a snapshot to `slot` without firing hooks.
    ///
    /// - absent → present: added at index 0
    /// - present → absent: removed; the returned entry carries the old value
    /// - present → present: modified in place (0 → 0)
    /// - absent → absent: `exists` is cleared, nothing is reported
    ///
    /// A feed that repeats a still-missing document therefore never reaches
    /// `on_modified`; callers that want a notification for it must watch the
    /// slot's `exists` flag themselves.
    pub fn mutate(&self, slot: &mut Entry, snapshot: Option<Value>) -> Option<Applied> {
        let had_data = slot.has_data();
        match snapshot {
            Some(value) if !had_data => {
                slot.id.clone_from(&self.id);
                slot.data = value;
                slot.exists = true;
                debug!(id = %self.id, "document added");
                Some(Applied::Added {
                    entry: slot.clone(),
                    index: 0,
                    relocated_from: None,
                })
            }
            Some(value) => {
                let previous = write_value(&self.config, slot, &value);
                debug!(id = %self.id, "document modified");
                Some(Applied::Modified {
                    entry: slot.clone(),
                    previous,
                    old_index: 0,
                    new_index: 0,
                })
            }
            None if had_data => {
                let entry = Entry {
                    id: self.id.clone(),
                    data: std::mem::take(&mut slot.data),
                    exists: true,
                };
                slot.exists = false;
                debug!(id = %self.id, "document removed");
                Some(Applied::Removed { entry, old_index: 0 })
            }
            None => {
                slot.id.clone_from(&self.id);
                slot.exists = false;
                None
            }
        }
    }
}
