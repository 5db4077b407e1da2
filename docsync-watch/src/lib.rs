//! Ordered list reconciliation and change-feed bindings for docsync.
//!
//! Keeps caller-owned local state in step with a document store's change
//! feed.
//!
//! # Architecture
//!
//! - **Reconciler**: applies added / modified / removed events to a
//!   [`TrackedSequence`](docsync_types::TrackedSequence), preserving order
//!   and identifier uniqueness, then fires the [`Hooks`]
//! - **DocumentBinding**: the same for a single document slot
//! - **Feed**: the collaborator seams ([`CollectionSource`], [`DocumentSource`])
//! - **Watch**: [`CollectionRef`] / [`DocumentRef`] compose a source with a
//!   binding and expose typed `get` and `watch`
//! - **Memory**: [`MemoryCollection`], an in-memory source
//!
//! Everything is synchronous. A feed delivers one batch at a time; the
//! binding finishes mutating and firing hooks for a batch before the next one
//! is accepted.
//!
//! # Example
//!
//! ```
//! use docsync_watch::{CollectionRef, MemoryCollection, SharedSequence, WatchOptions};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let store = MemoryCollection::new();
//! store.set("a", json!({"x": 1}));
//!
//! let todos = CollectionRef::new(store.clone());
//! let local = SharedSequence::default();
//! let sub = todos.watch(Some(Arc::clone(&local)), WatchOptions::new()).unwrap();
//!
//! store.set("b", json!({"x": 2}));
//! assert_eq!(local.lock().len(), 2);
//! sub.unsubscribe();
//! ```

mod config;
mod document;
mod error;
mod feed;
mod hooks;
mod memory;
mod reconciler;
mod watch;

pub use config::{ReconcileConfig, UpdateMode};
pub use document::DocumentBinding;
pub use error::{FeedError, WatchError, WatchResult};
pub use feed::{
    ChangeListener, CollectionSource, DocumentListener, DocumentSource, FeedResult,
    ListenOptions, Subscription, Unsubscribe,
};
pub use hooks::{AddedHook, ErrorHook, Hooks, ModifiedHook, RemovedHook};
pub use memory::{compare_values, MemoryCollection, MemoryDocument};
pub use reconciler::{bind, insertion_point, Applied, Reconciler};
pub use watch::{CollectionRef, DocumentRef, SharedEntry, SharedSequence, WatchOptions};
