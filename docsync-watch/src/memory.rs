//! In-memory change feed.
//!
//! [`MemoryCollection`] keeps documents in query order (by identifier, or by
//! a JSON-pointer field with the identifier as tie-break) and emits the same
//! change events a remote feed would. It backs tests and local-only use.
//!
//! Writers are serialized and listeners run outside the state lock, so a
//! hook may read the collection. A hook must not write to the collection it
//! is listening to; such a write panics instead of deadlocking.

use crate::error::FeedError;
use crate::feed::{
    ChangeListener, CollectionSource, DocumentListener, DocumentSource, FeedResult,
    ListenOptions, Unsubscribe,
};
use docsync_types::{ChangeEvent, Entry};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

type Shared<L> = Arc<Mutex<L>>;

struct CollectionSlot {
    id: u64,
    listener: Shared<ChangeListener>,
}

struct DocumentSlot {
    id: u64,
    doc_id: String,
    listener: Shared<DocumentListener>,
}

#[derive(Default)]
struct State {
    docs: Vec<Entry>,
    order_by: Option<String>,
    collection_listeners: Vec<CollectionSlot>,
    document_listeners: Vec<DocumentSlot>,
    next_listener: u64,
}

impl State {
    fn next_listener_id(&mut self) -> u64 {
        self.next_listener += 1;
        self.next_listener
    }

    fn sort_key<'a>(&self, entry: &'a Entry) -> &'a Value {
        self.order_by
            .as_deref()
            .and_then(|pointer| entry.data.pointer(pointer))
            .unwrap_or(&Value::Null)
    }

    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        compare_values(self.sort_key(a), self.sort_key(b)).then_with(|| a.id.cmp(&b.id))
    }

    /// Index at which `entry` belongs in `docs`.
    fn position_for(&self, entry: &Entry) -> usize {
        self.docs
            .partition_point(|e| self.compare(e, entry) == Ordering::Less)
    }

    fn listeners_for(&self, doc_id: &str) -> (Vec<Shared<ChangeListener>>, Vec<Shared<DocumentListener>>) {
        let collection = self
            .collection_listeners
            .iter()
            .map(|slot| Arc::clone(&slot.listener))
            .collect();
        let documents = self
            .document_listeners
            .iter()
            .filter(|slot| slot.doc_id == doc_id)
            .map(|slot| Arc::clone(&slot.listener))
            .collect();
        (collection, documents)
    }
}

/// Serializes writers and remembers which thread is delivering.
#[derive(Default)]
struct WriterGate {
    lock: Mutex<()>,
    holder: Mutex<Option<ThreadId>>,
}

impl WriterGate {
    fn enter(&self) -> WriterGuard<'_> {
        let me = thread::current().id();
        if *self.holder.lock() == Some(me) {
            warn!("listener wrote to the memory collection it listens to");
            panic!("MemoryCollection written from one of its own listeners");
        }
        let guard = self.lock.lock();
        *self.holder.lock() = Some(me);
        WriterGuard {
            gate: self,
            _lock: guard,
        }
    }
}

struct WriterGuard<'a> {
    gate: &'a WriterGate,
    _lock: MutexGuard<'a, ()>,
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        *self.gate.holder.lock() = None;
    }
}

/// An in-memory collection that emits change events on every write.
#[derive(Clone, Default)]
pub struct MemoryCollection {
    state: Arc<Mutex<State>>,
    writer: Arc<WriterGate>,
}

impl MemoryCollection {
    /// Creates an empty collection ordered by document identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection ordered by the field at `pointer`
    /// (e.g. `/rank`), then by identifier.
    #[must_use]
    pub fn ordered_by(pointer: impl Into<String>) -> Self {
        let collection = Self::default();
        collection.state.lock().order_by = Some(pointer.into());
        collection
    }

    /// Returns the number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().docs.len()
    }

    /// Returns true if the collection holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the documents in query order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Entry> {
        self.state.lock().docs.clone()
    }

    /// Returns the number of active listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let state = self.state.lock();
        state.collection_listeners.len() + state.document_listeners.len()
    }

    /// Returns a handle to the document `id`.
    #[must_use]
    pub fn doc(&self, id: impl Into<String>) -> MemoryDocument {
        MemoryDocument {
            id: id.into(),
            collection: self.clone(),
        }
    }

    /// Creates or replaces the document `id` and returns the emitted event.
    pub fn set(&self, id: impl Into<String>, value: Value) -> ChangeEvent {
        let _writer = self.writer.enter();
        let id = id.into();
        let (event, collection, documents) = {
            let mut state = self.state.lock();
            let entry = Entry::new(id.clone(), value.clone());
            let event = match state.docs.iter().position(|e| e.id == id) {
                Some(old_index) => {
                    state.docs.remove(old_index);
                    let position = state.position_for(&entry);
                    state.docs.insert(position, entry);
                    ChangeEvent::modified(id.clone(), value.clone(), old_index, move_index(old_index, position))
                }
                None => {
                    let position = state.position_for(&entry);
                    state.docs.insert(position, entry);
                    ChangeEvent::added(id.clone(), value.clone(), position)
                }
            };
            let (collection, documents) = state.listeners_for(&id);
            (event, collection, documents)
        };

        debug!(%event, "memory collection write");
        for listener in collection {
            deliver(&listener, Ok(vec![event.clone()]));
        }
        for listener in documents {
            deliver(&listener, Ok(Some(value.clone())));
        }
        event
    }

    /// Deletes the document `id` and returns the emitted event, if it existed.
    pub fn delete(&self, id: &str) -> Option<ChangeEvent> {
        let _writer = self.writer.enter();
        let (event, collection, documents) = {
            let mut state = self.state.lock();
            let old_index = state.docs.iter().position(|e| e.id == id)?;
            state.docs.remove(old_index);
            let (collection, documents) = state.listeners_for(id);
            (ChangeEvent::removed(id, old_index), collection, documents)
        };

        debug!(%event, "memory collection delete");
        for listener in collection {
            deliver(&listener, Ok(vec![event.clone()]));
        }
        for listener in documents {
            deliver(&listener, Ok(None));
        }
        Some(event)
    }

    /// Delivers `error` to every listener.
    pub fn fail(&self, error: FeedError) {
        let _writer = self.writer.enter();
        let (collection, documents): (Vec<_>, Vec<_>) = {
            let state = self.state.lock();
            (
                state
                    .collection_listeners
                    .iter()
                    .map(|slot| Arc::clone(&slot.listener))
                    .collect(),
                state
                    .document_listeners
                    .iter()
                    .map(|slot| Arc::clone(&slot.listener))
                    .collect(),
            )
        };
        for listener in collection {
            deliver(&listener, Err(error.clone()));
        }
        for listener in documents {
            deliver(&listener, Err(error.clone()));
        }
    }

    fn unsubscribe_handle(&self, listener_id: u64) -> Unsubscribe {
        let state: Weak<Mutex<State>> = Arc::downgrade(&self.state);
        Box::new(move || {
            if let Some(state) = state.upgrade() {
                let mut state = state.lock();
                state.collection_listeners.retain(|slot| slot.id != listener_id);
                state.document_listeners.retain(|slot| slot.id != listener_id);
            }
        })
    }
}

impl CollectionSource for MemoryCollection {
    fn get(&self) -> FeedResult<Vec<Entry>> {
        Ok(self.snapshot())
    }

    fn listen(&self, options: &ListenOptions, listener: ChangeListener) -> Unsubscribe {
        let _writer = self.writer.enter();
        let listener = Arc::new(Mutex::new(listener));
        let (listener_id, initial) = {
            let mut state = self.state.lock();
            let listener_id = state.next_listener_id();
            state.collection_listeners.push(CollectionSlot {
                id: listener_id,
                listener: Arc::clone(&listener),
            });
            let initial: Vec<ChangeEvent> = state
                .docs
                .iter()
                .enumerate()
                .map(|(i, e)| ChangeEvent::added(e.id.clone(), e.data.clone(), i))
                .collect();
            (listener_id, initial)
        };

        debug!(listener = listener_id, ?options, initial = initial.len(), "collection listener added");
        deliver(&listener, Ok(initial));
        self.unsubscribe_handle(listener_id)
    }
}

/// Handle to one document of a [`MemoryCollection`].
#[derive(Clone)]
pub struct MemoryDocument {
    id: String,
    collection: MemoryCollection,
}

impl MemoryDocument {
    /// Creates or replaces the document.
    pub fn set(&self, value: Value) -> ChangeEvent {
        self.collection.set(self.id.clone(), value)
    }

    /// Deletes the document.
    pub fn delete(&self) -> Option<ChangeEvent> {
        self.collection.delete(&self.id)
    }
}

impl DocumentSource for MemoryDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self) -> FeedResult<Option<Value>> {
        let state = self.collection.state.lock();
        Ok(state
            .docs
            .iter()
            .find(|e| e.id == self.id)
            .map(|e| e.data.clone()))
    }

    fn listen(&self, options: &ListenOptions, listener: DocumentListener) -> Unsubscribe {
        let _writer = self.collection.writer.enter();
        let listener = Arc::new(Mutex::new(listener));
        let (listener_id, current) = {
            let mut state = self.collection.state.lock();
            let listener_id = state.next_listener_id();
            state.document_listeners.push(DocumentSlot {
                id: listener_id,
                doc_id: self.id.clone(),
                listener: Arc::clone(&listener),
            });
            let current = state
                .docs
                .iter()
                .find(|e| e.id == self.id)
                .map(|e| e.data.clone());
            (listener_id, current)
        };

        debug!(listener = listener_id, document = %self.id, ?options, "document listener added");
        deliver(&listener, Ok(current));
        self.collection.unsubscribe_handle(listener_id)
    }
}

fn deliver<T>(listener: &Shared<Box<dyn FnMut(T) + Send>>, payload: T) {
    let mut listener = listener.lock();
    (listener.as_mut())(payload);
}

/// Event index for an entry that moved from `old_index` to final position
/// `position`, following the reconciler's shift rule.
fn move_index(old_index: usize, position: usize) -> usize {
    if position > old_index { position + 1 } else { position }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values used for query ordering.
///
/// Values of different types order null < bool < number < string < array <
/// object. Numbers compare numerically, arrays and objects element-wise.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(a, b)| compare_values(a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y)
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb)))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
