//! Core type definitions for docsync.
//!
//! This crate defines the data model shared by the merge and watch layers:
//! - [`Entry`] and its typed view [`Doc<T>`] (one tracked document)
//! - [`TrackedSequence`] (the caller-owned ordered list of entries)
//! - [`ChangeEvent`] (one added / modified / removed notification)
//! - [`SubscriptionId`] (UUID v7, used to correlate a watch in logs)
//!
//! Document payloads are untyped JSON trees (`serde_json::Value`). The
//! core never looks inside them except when a structural merge is asked for.

mod entry;
mod event;
mod ids;

pub use entry::{Doc, Entry, TrackedSequence};
pub use event::{ChangeEvent, ChangeKind};
pub use ids::SubscriptionId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document {id} does not exist")]
    Missing { id: String },
}
