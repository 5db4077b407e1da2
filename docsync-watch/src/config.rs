//! Reconciler configuration.

use crate::error::WatchResult;
use serde::{Deserialize, Serialize};

/// How a new value is written onto an entry that is already tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Replace the whole value.
    #[default]
    Replace,
    /// Patch the existing value with a structural merge, touching only the
    /// leaves that differ.
    Merge,
}

/// Configuration for a [`Reconciler`](crate::Reconciler).
///
/// Every field is defaulted, so a partial JSON document is a valid config:
///
/// ```
/// use docsync_watch::{ReconcileConfig, UpdateMode};
///
/// let config = ReconcileConfig::from_json(r#"{"update_mode": "merge"}"#).unwrap();
/// assert_eq!(config.update_mode, UpdateMode::Merge);
/// assert!(config.dedupe_first_run);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Pass the previous entry to `on_modified`. Costs a clone per
    /// modification in merge mode.
    pub capture_old_value: bool,
    /// During the first delivered batch, treat an added event for an
    /// identifier already in the sequence as update-and-move instead of an
    /// insertion. Lets a caller pre-seed the sequence without duplicates.
    pub dedupe_first_run: bool,
    /// How values of tracked entries are updated.
    pub update_mode: UpdateMode,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            capture_old_value: false,
            dedupe_first_run: true,
            update_mode: UpdateMode::Replace,
        }
    }
}

impl ReconcileConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> WatchResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets `capture_old_value`.
    #[must_use]
    pub fn with_capture_old_value(mut self, capture: bool) -> Self {
        self.capture_old_value = capture;
        self
    }

    /// Sets `dedupe_first_run`.
    #[must_use]
    pub fn with_dedupe_first_run(mut self, dedupe: bool) -> Self {
        self.dedupe_first_run = dedupe;
        self
    }

    /// Sets `update_mode`.
    #[must_use]
    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }
}
