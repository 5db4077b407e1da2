//! Change-feed collaborator seams.
//!
//! The watch layer does not know how changes are obtained. A backing store
//! plugs in by implementing [`CollectionSource`] or [`DocumentSource`]:
//! listeners are invoked with ordered batches, one delivery at a time, until
//! the returned [`Unsubscribe`] handle is called.

use crate::error::FeedError;
use docsync_types::{ChangeEvent, Entry, SubscriptionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::info;

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Receives ordered batches of change events for a collection or query.
pub type ChangeListener = Box<dyn FnMut(FeedResult<Vec<ChangeEvent>>) + Send>;

/// Receives the full document (`None` when it does not exist) on every change.
pub type DocumentListener = Box<dyn FnMut(FeedResult<Option<Value>>) + Send>;

/// An owned one-shot closure that stops future delivery when called.
pub type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

/// Listen options passed through to the feed untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenOptions {
    /// Deliver batches for metadata-only changes too.
    pub include_metadata_changes: bool,
}

/// A collection or query that can be read once or listened to.
pub trait CollectionSource {
    /// Reads the current contents in query order.
    fn get(&self) -> FeedResult<Vec<Entry>>;

    /// Starts delivering change batches to `listener`.
    ///
    /// The first batch describes the current contents as added events.
    fn listen(&self, options: &ListenOptions, listener: ChangeListener) -> Unsubscribe;
}

/// A single document that can be read once or listened to.
pub trait DocumentSource {
    /// Returns the document's identifier.
    fn id(&self) -> &str;

    /// Reads the document; `None` if it does not exist.
    fn get(&self) -> FeedResult<Option<Value>>;

    /// Starts delivering snapshots to `listener`, beginning with the current
    /// state.
    fn listen(&self, options: &ListenOptions, listener: DocumentListener) -> Unsubscribe;
}

/// Handle to a running watch.
///
/// Dropping the handle does not stop delivery; call
/// [`unsubscribe`](Self::unsubscribe). Callbacks already running are allowed
/// to finish.
pub struct Subscription {
    id: SubscriptionId,
    off: Option<Unsubscribe>,
}

impl Subscription {
    /// Wraps a feed's unsubscribe handle.
    #[must_use]
    pub fn new(id: SubscriptionId, off: Unsubscribe) -> Self {
        Self { id, off: Some(off) }
    }

    /// Returns the subscription's identifier.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stops future delivery.
    pub fn unsubscribe(mut self) {
        if let Some(off) = self.off.take() {
            off();
            info!(subscription = %self.id, "unsubscribed");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.off.is_some())
            .finish()
    }
}
