//! Shared test helpers for watch tests.

#![allow(dead_code)]

use docsync_types::Entry;
use docsync_watch::Hooks;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Installs an env-filtered subscriber writing to the test output.
/// Set `RUST_LOG=docsync_watch=debug` to see reconciler logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds an entry.
pub fn entry(id: &str, data: Value) -> Entry {
    Entry::new(id, data)
}

/// Identifiers of `entries`, in order.
pub fn ids(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.id.as_str()).collect()
}

/// Shared log of hook invocations.
pub type HookLog = Arc<Mutex<Vec<String>>>;

/// Hooks that record every invocation as a short string.
pub fn recording_hooks() -> (Hooks, HookLog) {
    let log: HookLog = Arc::default();
    let (added, modified, removed, error) = (
        Arc::clone(&log),
        Arc::clone(&log),
        Arc::clone(&log),
        Arc::clone(&log),
    );
    let hooks = Hooks::new()
        .on_added(move |e, i| added.lock().push(format!("added {} @{i} {}", e.id, e.data)))
        .on_modified(move |e, old, new, prev| {
            let prev = prev.map(|p| p.data.to_string()).unwrap_or_else(|| "-".into());
            modified
                .lock()
                .push(format!("modified {} {old}->{new} {} was {prev}", e.id, e.data));
        })
        .on_removed(move |e| removed.lock().push(format!("removed {} {}", e.id, e.data)))
        .on_error(move |err| error.lock().push(format!("error {err}")));
    (hooks, log)
}
