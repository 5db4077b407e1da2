//! Lifecycle callbacks fired after each applied change.

use crate::error::WatchError;
use crate::reconciler::Applied;
use docsync_types::Entry;
use std::fmt;

/// Called with the added entry and the event's `new_index`.
pub type AddedHook = Box<dyn FnMut(&Entry, usize) + Send>;
/// Called with the updated entry, `old_index`, `new_index` and, when
/// `capture_old_value` is set, the entry as it was before the change.
pub type ModifiedHook = Box<dyn FnMut(&Entry, usize, usize, Option<&Entry>) + Send>;
/// Called with the removed entry.
pub type RemovedHook = Box<dyn FnMut(&Entry) + Send>;
/// Called with upstream feed errors and with local errors hit by a watch.
pub type ErrorHook = Box<dyn FnMut(&WatchError) + Send>;

/// Optional lifecycle callbacks. Unset callbacks are no-ops.
///
/// ```
/// use docsync_watch::Hooks;
///
/// let hooks = Hooks::new()
///     .on_added(|entry, index| println!("{} added at {index}", entry.id))
///     .on_removed(|entry| println!("{} removed", entry.id));
/// ```
pub struct Hooks {
    added: AddedHook,
    modified: ModifiedHook,
    removed: RemovedHook,
    error: ErrorHook,
}

impl Hooks {
    /// Creates a set of no-op hooks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            added: Box::new(|_, _| {}),
            modified: Box::new(|_, _, _, _| {}),
            removed: Box::new(|_| {}),
            error: Box::new(|_| {}),
        }
    }

    /// Sets the callback fired after an entry is added.
    #[must_use]
    pub fn on_added(mut self, hook: impl FnMut(&Entry, usize) + Send + 'static) -> Self {
        self.added = Box::new(hook);
        self
    }

    /// Sets the callback fired after an entry is modified.
    #[must_use]
    pub fn on_modified(
        mut self,
        hook: impl FnMut(&Entry, usize, usize, Option<&Entry>) + Send + 'static,
    ) -> Self {
        self.modified = Box::new(hook);
        self
    }

    /// Sets the callback fired after an entry is removed.
    #[must_use]
    pub fn on_removed(mut self, hook: impl FnMut(&Entry) + Send + 'static) -> Self {
        self.removed = Box::new(hook);
        self
    }

    /// Sets the callback receiving feed errors.
    #[must_use]
    pub fn on_error(mut self, hook: impl FnMut(&WatchError) + Send + 'static) -> Self {
        self.error = Box::new(hook);
        self
    }

    /// Fires the callback matching `applied`.
    pub fn fire(&mut self, applied: &Applied) {
        match applied {
            Applied::Added { entry, index, .. } => (self.added)(entry, *index),
            Applied::Modified {
                entry,
                previous,
                old_index,
                new_index,
            } => (self.modified)(entry, *old_index, *new_index, previous.as_ref()),
            Applied::Removed { entry, .. } => (self.removed)(entry),
        }
    }

    /// Fires the error callback.
    pub fn fail(&mut self, error: &WatchError) {
        (self.error)(error);
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
