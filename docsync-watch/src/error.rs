//! Error types for the watch layer.

use docsync_types::ChangeKind;
use thiserror::Error;

/// Result type for watch operations.
pub type WatchResult<T> = Result<T, WatchError>;

/// Upstream error reported by a change feed.
///
/// Passed through verbatim; the watch layer never interprets or retries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct FeedError {
    /// Feed-specific error code (e.g. `permission-denied`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl FeedError {
    /// Creates a feed error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while binding change events to local state.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The caller did not supply the mutable container to bind into.
    #[error("no {what} to bind into; initialize it before watching")]
    MissingTarget { what: &'static str },

    /// An event index lies outside the current sequence bounds.
    #[error("{kind} event for {id}: index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        kind: ChangeKind,
        id: String,
        index: usize,
        len: usize,
    },

    /// The entry at the event's old index carries another identifier.
    #[error("{kind} event for {expected}: entry at index {index} is {found}")]
    IdentifierMismatch {
        kind: ChangeKind,
        expected: String,
        found: String,
        index: usize,
    },

    /// An added event names an identifier that is already tracked.
    #[error("added event for {id}: identifier already present at index {index}")]
    DuplicateIdentifier { id: String, index: usize },

    /// Upstream feed error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Typed decoding failed.
    #[error("decode error: {0}")]
    Decode(#[from] docsync_types::Error),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
