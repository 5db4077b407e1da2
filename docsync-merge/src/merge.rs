//! The merge algorithm.
//!
//! For every key (or index) of the source:
//! - a primitive is assigned only when it differs from the target's value
//! - a record makes sure the target slot is a record, then recurses
//! - a sequence makes sure the target slot is a sequence, truncates it to the
//!   source length, then merges item by item
//!
//! Keys of a target record that are absent from the source are deleted.

use crate::Shape;
use serde_json::{Map, Value};
use std::ops::AddAssign;

/// What a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Values written: leaf assignments, container replacements and newly
    /// inserted keys or items.
    pub writes: usize,
    /// Record keys deleted plus sequence items truncated.
    pub removals: usize,
}

impl MergeStats {
    /// Returns true if the merge left the target untouched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.writes == 0 && self.removals == 0
    }
}

impl AddAssign for MergeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.writes += rhs.writes;
        self.removals += rhs.removals;
    }
}

/// Merges `source` onto `target` in place and reports what changed.
pub fn merge(target: &mut Value, source: &Value) -> MergeStats {
    let mut stats = MergeStats::default();
    merge_node(target, source, &mut stats);
    stats
}

/// Merges `source` onto `target` in place and returns `target`.
pub fn deep_update<'a>(target: &'a mut Value, source: &Value) -> &'a mut Value {
    merge_node(target, source, &mut MergeStats::default());
    target
}

fn merge_node(target: &mut Value, source: &Value, stats: &mut MergeStats) {
    match Shape::of(source) {
        Shape::Primitive(value) => {
            if target != value {
                *target = value.clone();
                stats.writes += 1;
            }
        }
        Shape::Record(fields) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
                stats.writes += 1;
            }
            if let Value::Object(slots) = target {
                merge_record(slots, fields, stats);
            }
        }
        Shape::Sequence(items) => {
            if !target.is_array() {
                *target = Value::Array(Vec::with_capacity(items.len()));
                stats.writes += 1;
            }
            if let Value::Array(slots) = target {
                merge_sequence(slots, items, stats);
            }
        }
    }
}

fn merge_record(target: &mut Map<String, Value>, source: &Map<String, Value>, stats: &mut MergeStats) {
    for (key, value) in source {
        match target.get_mut(key) {
            Some(slot) => merge_node(slot, value, stats),
            None => {
                target.insert(key.clone(), value.clone());
                stats.writes += 1;
            }
        }
    }

    // Every source key is present by now, so a longer target has extras.
    if target.len() > source.len() {
        let before = target.len();
        target.retain(|key, _| source.contains_key(key));
        stats.removals += before - target.len();
    }
}

fn merge_sequence(target: &mut Vec<Value>, source: &[Value], stats: &mut MergeStats) {
    if target.len() > source.len() {
        stats.removals += target.len() - source.len();
        target.truncate(source.len());
    }

    for (i, value) in source.iter().enumerate() {
        match target.get_mut(i) {
            Some(slot) => merge_node(slot, value, stats),
            None => {
                target.push(value.clone());
                stats.writes += 1;
            }
        }
    }
}
