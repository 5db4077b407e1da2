//! Typed fetch and watch over a change-feed source.
//!
//! [`CollectionRef`] and [`DocumentRef`] wrap a source by composition and
//! expose `get` (typed one-shot read) and `watch` (keep a caller-owned
//! container in step with the feed).

use crate::config::ReconcileConfig;
use crate::document::DocumentBinding;
use crate::error::{WatchError, WatchResult};
use crate::feed::{
    CollectionSource, DocumentSource, FeedResult, ListenOptions, Subscription,
};
use crate::hooks::Hooks;
use crate::reconciler::Reconciler;
use docsync_types::{ChangeEvent, Doc, Entry, SubscriptionId, TrackedSequence};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A tracked sequence shared between the caller and a running watch.
pub type SharedSequence = Arc<Mutex<TrackedSequence>>;

/// A document slot shared between the caller and a running watch.
pub type SharedEntry = Arc<Mutex<Entry>>;

/// Options for [`CollectionRef::watch`] and [`DocumentRef::watch`].
#[derive(Debug, Default)]
pub struct WatchOptions {
    /// Passed through to the feed.
    pub listen: ListenOptions,
    /// Reconciler behaviour.
    pub config: ReconcileConfig,
    /// Lifecycle callbacks.
    pub hooks: Hooks,
}

impl WatchOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listen options.
    #[must_use]
    pub fn with_listen(mut self, listen: ListenOptions) -> Self {
        self.listen = listen;
        self
    }

    /// Sets the reconciler configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }
}

// ── Collections ──────────────────────────────────────────────────

/// A collection or query source with typed fetch and watch.
#[derive(Debug, Clone)]
pub struct CollectionRef<S> {
    source: S,
}

impl<S: CollectionSource> CollectionRef<S> {
    /// Wraps `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns the wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Reads the current contents as untyped entries.
    pub fn get_entries(&self) -> WatchResult<Vec<Entry>> {
        Ok(self.source.get()?)
    }

    /// Reads the current contents, decoding every document into `T`.
    pub fn get<T: DeserializeOwned>(&self) -> WatchResult<Vec<Doc<T>>> {
        self.source
            .get()?
            .iter()
            .map(|entry| entry.decode().map_err(WatchError::from))
            .collect()
    }

    /// Keeps `target` in step with the source until unsubscribed.
    ///
    /// Fails with [`WatchError::MissingTarget`] when `target` is `None`.
    /// Entries already in `target` are matched by identifier during the
    /// first batch when `dedupe_first_run` is set.
    pub fn watch(
        &self,
        target: Option<SharedSequence>,
        options: WatchOptions,
    ) -> WatchResult<Subscription> {
        let target = target.ok_or(WatchError::MissingTarget { what: "sequence" })?;
        let WatchOptions {
            listen,
            config,
            hooks,
        } = options;

        let id = SubscriptionId::new();
        let mut binding = CollectionBinding {
            id,
            target,
            reconciler: Reconciler::new(config, hooks),
            poisoned: false,
        };
        info!(subscription = %id, "watching collection");
        let off = self
            .source
            .listen(&listen, Box::new(move |delivery| binding.deliver(delivery)));
        Ok(Subscription::new(id, off))
    }
}

struct CollectionBinding {
    id: SubscriptionId,
    target: SharedSequence,
    reconciler: Reconciler,
    poisoned: bool,
}

impl CollectionBinding {
    fn deliver(&mut self, delivery: FeedResult<Vec<ChangeEvent>>) {
        let events = match delivery {
            Ok(events) => events,
            Err(err) => {
                warn!(subscription = %self.id, error = %err, "feed error");
                self.reconciler.report(&WatchError::Feed(err));
                return;
            }
        };
        if self.poisoned {
            debug!(subscription = %self.id, changes = events.len(), "ignoring batch after failed batch");
            return;
        }

        debug!(subscription = %self.id, changes = events.len(), "delivering batch");
        for event in &events {
            // The lock is released before hooks run so they can read the target.
            let applied = {
                let mut sequence = self.target.lock();
                self.reconciler.mutate(&mut sequence, event)
            };
            match applied {
                Ok(applied) => self.reconciler.notify(&applied),
                Err(err) => {
                    warn!(subscription = %self.id, error = %err, "rejected change; resubscribe to recover");
                    self.poisoned = true;
                    self.reconciler.report(&err);
                    break;
                }
            }
        }
        self.reconciler.finish_batch();
    }
}

// ── Documents ────────────────────────────────────────────────────

/// A single document source with typed fetch and watch.
#[derive(Debug, Clone)]
pub struct DocumentRef<S> {
    source: S,
}

impl<S: DocumentSource> DocumentRef<S> {
    /// Wraps `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns the wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the document's identifier.
    pub fn id(&self) -> &str {
        self.source.id()
    }

    /// Reads the document as an untyped entry ([`Entry::missing`] if absent).
    pub fn get_entry(&self) -> WatchResult<Entry> {
        Ok(match self.source.get()? {
            Some(data) => Entry::new(self.source.id(), data),
            None => Entry::missing(self.source.id()),
        })
    }

    /// Reads the document, decoding it into `T`. `data` is `None` and
    /// `exists` false when the document does not exist.
    pub fn get<T: DeserializeOwned>(&self) -> WatchResult<Doc<Option<T>>> {
        Ok(self.get_entry()?.decode()?)
    }

    /// Keeps `target` in step with the document until unsubscribed.
    ///
    /// Fails with [`WatchError::MissingTarget`] when `target` is `None`.
    pub fn watch(
        &self,
        target: Option<SharedEntry>,
        options: WatchOptions,
    ) -> WatchResult<Subscription> {
        let target = target.ok_or(WatchError::MissingTarget { what: "document" })?;
        let WatchOptions {
            listen,
            config,
            hooks,
        } = options;

        let id = SubscriptionId::new();
        let mut binding = DocumentWatch {
            id,
            target,
            binding: DocumentBinding::new(self.source.id(), config, hooks),
        };
        info!(subscription = %id, document = %self.source.id(), "watching document");
        let off = self
            .source
            .listen(&listen, Box::new(move |delivery| binding.deliver(delivery)));
        Ok(Subscription::new(id, off))
    }
}

struct DocumentWatch {
    id: SubscriptionId,
    target: SharedEntry,
    binding: DocumentBinding,
}

impl DocumentWatch {
    fn deliver(&mut self, delivery: FeedResult<Option<Value>>) {
        match delivery {
            Ok(snapshot) => {
                let applied = {
                    let mut slot = self.target.lock();
                    self.binding.mutate(&mut slot, snapshot)
                };
                if let Some(applied) = applied {
                    self.binding.notify(&applied);
                }
            }
            Err(err) => {
                warn!(subscription = %self.id, error = %err, "feed error");
                self.binding.report(&WatchError::Feed(err));
            }
        }
    }
}
