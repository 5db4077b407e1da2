//! Change events delivered by a change feed.
//!
//! Positions follow the feed's semantics: an added entry's `new_index` is
//! its position after insertion, a removed entry's `old_index` its position
//! before removal. Indices are only valid relative to the sequence state
//! produced by every earlier event, so events must be applied in delivery
//! order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        })
    }
}

/// One added / modified / removed notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A document entered the result set.
    Added {
        id: String,
        value: Value,
        new_index: usize,
    },

    /// A document changed, possibly moving to another position.
    Modified {
        id: String,
        value: Value,
        old_index: usize,
        new_index: usize,
    },

    /// A document left the result set.
    Removed { id: String, old_index: usize },
}

impl ChangeEvent {
    /// Creates an added event.
    #[must_use]
    pub fn added(id: impl Into<String>, value: Value, new_index: usize) -> Self {
        Self::Added {
            id: id.into(),
            value,
            new_index,
        }
    }

    /// Creates a modified event.
    #[must_use]
    pub fn modified(
        id: impl Into<String>,
        value: Value,
        old_index: usize,
        new_index: usize,
    ) -> Self {
        Self::Modified {
            id: id.into(),
            value,
            old_index,
            new_index,
        }
    }

    /// Creates a removed event.
    #[must_use]
    pub fn removed(id: impl Into<String>, old_index: usize) -> Self {
        Self::Removed {
            id: id.into(),
            old_index,
        }
    }

    /// Returns the kind of change.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Added { .. } => ChangeKind::Added,
            Self::Modified { .. } => ChangeKind::Modified,
            Self::Removed { .. } => ChangeKind::Removed,
        }
    }

    /// Returns the identifier of the changed document.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Added { id, .. } | Self::Modified { id, .. } | Self::Removed { id, .. } => id,
        }
    }

    /// Returns the new value (absent for removals).
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Added { value, .. } | Self::Modified { value, .. } => Some(value),
            Self::Removed { .. } => None,
        }
    }

    /// Returns the position before the change (absent for additions).
    #[must_use]
    pub fn old_index(&self) -> Option<usize> {
        match self {
            Self::Added { .. } => None,
            Self::Modified { old_index, .. } | Self::Removed { old_index, .. } => Some(*old_index),
        }
    }

    /// Returns the position after the change (absent for removals).
    #[must_use]
    pub fn new_index(&self) -> Option<usize> {
        match self {
            Self::Added { new_index, .. } | Self::Modified { new_index, .. } => Some(*new_index),
            Self::Removed { .. } => None,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { id, new_index, .. } => write!(f, "added {id} at {new_index}"),
            Self::Modified {
                id,
                old_index,
                new_index,
                ..
            } => write!(f, "modified {id} {old_index}->{new_index}"),
            Self::Removed { id, old_index } => write!(f, "removed {id} from {old_index}"),
        }
    }
}
