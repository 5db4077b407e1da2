mod common;

use common::{entry, ids, init_tracing, recording_hooks};
use docsync_types::{ChangeEvent, Doc, Entry};
use docsync_watch::{
    ChangeListener, CollectionRef, CollectionSource, FeedError, FeedResult, Hooks,
    ListenOptions, MemoryCollection, ReconcileConfig, SharedSequence, Unsubscribe, UpdateMode,
    WatchError, WatchOptions,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, PartialEq, Deserialize)]
struct Todo {
    title: String,
    rank: i64,
}

fn shared(entries: Vec<Entry>) -> SharedSequence {
    Arc::new(Mutex::new(entries))
}

// ── get ──────────────────────────────────────────────────────────

#[test]
fn get_returns_typed_documents_in_order() {
    let store = MemoryCollection::ordered_by("/rank");
    store.set("b", json!({"title": "second", "rank": 2}));
    store.set("a", json!({"title": "first", "rank": 1}));

    let todos: Vec<Doc<Todo>> = CollectionRef::new(store).get().unwrap();
    assert_eq!(
        todos,
        vec![
            Doc::new("a", Todo { title: "first".into(), rank: 1 }),
            Doc::new("b", Todo { title: "second".into(), rank: 2 }),
        ]
    );
}

#[test]
fn get_entries_untyped() {
    let store = MemoryCollection::new();
    store.set("x", json!(1));
    let col = CollectionRef::new(store);
    assert_eq!(col.get_entries().unwrap(), vec![entry("x", json!(1))]);
    assert_eq!(col.source().len(), 1);
}

#[test]
fn get_decode_failure() {
    let store = MemoryCollection::new();
    store.set("x", json!({"title": 1}));
    let err = CollectionRef::new(store).get::<Todo>().unwrap_err();
    assert!(matches!(err, WatchError::Decode(_)));
}

// ── watch ────────────────────────────────────────────────────────

#[test]
fn watch_without_sequence_fails_fast() {
    let store = MemoryCollection::new();
    let err = CollectionRef::new(store.clone())
        .watch(None, WatchOptions::new())
        .unwrap_err();
    assert!(matches!(err, WatchError::MissingTarget { what: "sequence" }));
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn watch_mirrors_store() {
    init_tracing();
    let store = MemoryCollection::ordered_by("/rank");
    store.set("a", json!({"rank": 1}));
    store.set("b", json!({"rank": 2}));

    let local = shared(Vec::new());
    let (hooks, log) = recording_hooks();
    let sub = CollectionRef::new(store.clone())
        .watch(Some(Arc::clone(&local)), WatchOptions::new().with_hooks(hooks))
        .unwrap();
    assert_eq!(*local.lock(), store.snapshot());

    store.set("c", json!({"rank": 0}));
    store.set("a", json!({"rank": 9}));
    store.delete("b");
    assert_eq!(*local.lock(), store.snapshot());
    assert_eq!(ids(&local.lock()), vec!["c", "a"]);

    assert_eq!(
        *log.lock(),
        vec![
            r#"added a @0 {"rank":1}"#.to_string(),
            r#"added b @1 {"rank":2}"#.to_string(),
            r#"added c @0 {"rank":0}"#.to_string(),
            r#"modified a 1->3 {"rank":9} was -"#.to_string(),
            r#"removed b {"rank":2}"#.to_string(),
        ]
    );

    sub.unsubscribe();
    store.set("d", json!({"rank": 5}));
    assert_eq!(ids(&local.lock()), vec!["c", "a"]);
}

#[test]
fn watch_dedupes_preseeded_sequence() {
    let store = MemoryCollection::new();
    store.set("a", json!({"v": 1}));
    store.set("b", json!({"v": 2}));

    let local = shared(vec![entry("b", json!({"v": 0})), entry("a", json!({"v": 0}))]);
    let _sub = CollectionRef::new(store.clone())
        .watch(Some(Arc::clone(&local)), WatchOptions::new())
        .unwrap();
    assert_eq!(
        *local.lock(),
        vec![entry("a", json!({"v": 1})), entry("b", json!({"v": 2}))]
    );
}

#[test]
fn two_watches_on_one_store_stay_independent() {
    let store = MemoryCollection::new();
    let first = shared(Vec::new());
    let second = shared(Vec::new());
    let col = CollectionRef::new(store.clone());
    let s1 = col.watch(Some(Arc::clone(&first)), WatchOptions::new()).unwrap();
    let s2 = col.watch(Some(Arc::clone(&second)), WatchOptions::new()).unwrap();
    assert_ne!(s1.id(), s2.id());

    store.set("a", json!(1));
    s1.unsubscribe();
    store.set("b", json!(2));

    assert_eq!(ids(&first.lock()), vec!["a"]);
    assert_eq!(ids(&second.lock()), vec!["a", "b"]);
    assert_eq!(store.listener_count(), 1);
    s2.unsubscribe();
}

#[test]
fn hooks_can_read_the_bound_sequence() {
    let store = MemoryCollection::new();
    let local = shared(Vec::new());
    let reader = Arc::clone(&local);
    let lengths = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lengths);
    let hooks = Hooks::new().on_added(move |_, _| sink.lock().push(reader.lock().len()));

    let _sub = CollectionRef::new(store.clone())
        .watch(Some(local), WatchOptions::new().with_hooks(hooks))
        .unwrap();
    store.set("a", json!(1));
    store.set("b", json!(2));
    assert_eq!(*lengths.lock(), vec![1, 2]);
}

#[test]
fn merge_mode_watch_patches_values() {
    let store = MemoryCollection::new();
    store.set("a", json!({"x": 1, "nested": {"y": 1, "z": 2}}));
    let local = shared(Vec::new());
    let options = WatchOptions::new()
        .with_config(ReconcileConfig::default().with_update_mode(UpdateMode::Merge))
        .with_listen(ListenOptions {
            include_metadata_changes: true,
        });
    let _sub = CollectionRef::new(store.clone())
        .watch(Some(Arc::clone(&local)), options)
        .unwrap();

    store.set("a", json!({"x": 1, "nested": {"y": 5}}));
    assert_eq!(local.lock()[0].data, json!({"x": 1, "nested": {"y": 5}}));
}

#[test]
fn feed_error_is_reported_and_watch_continues() {
    let store = MemoryCollection::new();
    let local = shared(Vec::new());
    let (hooks, log) = recording_hooks();
    let _sub = CollectionRef::new(store.clone())
        .watch(Some(Arc::clone(&local)), WatchOptions::new().with_hooks(hooks))
        .unwrap();

    store.fail(FeedError::new("unavailable", "backend offline"));
    store.set("a", json!(1));

    assert_eq!(
        *log.lock(),
        vec![
            "error feed error: unavailable: backend offline".to_string(),
            "added a @0 1".to_string(),
        ]
    );
    assert_eq!(ids(&local.lock()), vec!["a"]);
}

/// A feed that replays scripted deliveries on listen.
struct ScriptedFeed {
    deliveries: Vec<FeedResult<Vec<ChangeEvent>>>,
}

impl CollectionSource for ScriptedFeed {
    fn get(&self) -> FeedResult<Vec<Entry>> {
        Err(FeedError::new("unimplemented", "scripted feed has no contents"))
    }

    fn listen(&self, _options: &ListenOptions, mut listener: ChangeListener) -> Unsubscribe {
        for delivery in self.deliveries.clone() {
            listener(delivery);
        }
        Box::new(|| {})
    }
}

#[test]
fn rejected_event_poisons_the_watch() {
    let feed = ScriptedFeed {
        deliveries: vec![
            Ok(vec![ChangeEvent::added("a", json!(1), 0)]),
            Ok(vec![
                ChangeEvent::removed("zzz", 0),
                ChangeEvent::added("b", json!(2), 1),
            ]),
            Ok(vec![ChangeEvent::added("c", json!(3), 1)]),
        ],
    };
    let local = shared(Vec::new());
    let (hooks, log) = recording_hooks();
    let _sub = CollectionRef::new(feed)
        .watch(Some(Arc::clone(&local)), WatchOptions::new().with_hooks(hooks))
        .unwrap();

    assert_eq!(ids(&local.lock()), vec!["a"]);
    assert_eq!(
        *log.lock(),
        vec![
            "added a @0 1".to_string(),
            "error removed event for zzz: entry at index 0 is a".to_string(),
        ]
    );
}

#[test]
fn feed_errors_still_reported_after_rejected_batch() {
    let feed = ScriptedFeed {
        deliveries: vec![
            Ok(vec![ChangeEvent::removed("zzz", 0)]),
            Err(FeedError::new("permission-denied", "revoked")),
            Ok(vec![ChangeEvent::added("a", json!(1), 0)]),
        ],
    };
    let local = shared(Vec::new());
    let (hooks, log) = recording_hooks();
    let _sub = CollectionRef::new(feed)
        .watch(Some(Arc::clone(&local)), WatchOptions::new().with_hooks(hooks))
        .unwrap();

    assert!(local.lock().is_empty());
    assert_eq!(
        *log.lock(),
        vec![
            "error removed event for zzz: index 0 out of bounds for length 0".to_string(),
            "error feed error: permission-denied: revoked".to_string(),
        ]
    );
}

#[test]
fn scripted_feed_get_error_surfaces() {
    let err = CollectionRef::new(ScriptedFeed { deliveries: vec![] })
        .get_entries()
        .unwrap_err();
    assert!(matches!(err, WatchError::Feed(ref e) if e.code == "unimplemented"));
}
