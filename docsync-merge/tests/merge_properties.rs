//! Property-based tests for the structural merge.
//!
//! - Equality: after merge(t, s), t == s
//! - Idempotence: merging the same source twice performs no writes the second time
//! - Key-set convergence: record key sets and sequence lengths match the source
//! - Minimality: merging a tree onto an equal tree changes nothing

use docsync_merge::{merge, Shape};
use proptest::prelude::*;
use serde_json::{Map, Value};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(Value::from),
        "[a-e]{0,3}".prop_map(Value::String),
    ]
}

fn node_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map("[a-f]", inner, 0..5)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

fn assert_same_shape(target: &Value, source: &Value) -> Result<(), TestCaseError> {
    match (Shape::of(target), Shape::of(source)) {
        (Shape::Record(t), Shape::Record(s)) => {
            let tk: Vec<_> = t.keys().collect();
            let sk: Vec<_> = s.keys().collect();
            prop_assert_eq!(tk, sk);
            for (k, v) in s {
                assert_same_shape(&t[k], v)?;
            }
        }
        (Shape::Sequence(t), Shape::Sequence(s)) => {
            prop_assert_eq!(t.len(), s.len());
            for (a, b) in t.iter().zip(s) {
                assert_same_shape(a, b)?;
            }
        }
        (Shape::Primitive(t), Shape::Primitive(s)) => prop_assert_eq!(t, s),
        _ => prop_assert!(false, "shape mismatch: {target} vs {source}"),
    }
    Ok(())
}

// =============================================================================
// MERGE PROPERTIES
// =============================================================================

proptest! {
    /// The target ends up equal to the source.
    #[test]
    fn merge_converges_to_source(mut target in node_strategy(), source in node_strategy()) {
        merge(&mut target, &source);
        prop_assert_eq!(&target, &source);
    }

    /// merge(merge(t, s), s) leaves the same tree and writes nothing.
    #[test]
    fn merge_is_idempotent(mut target in node_strategy(), source in node_strategy()) {
        merge(&mut target, &source);
        let once = target.clone();
        let second = merge(&mut target, &source);
        prop_assert_eq!(&target, &once);
        prop_assert!(second.is_noop());
    }

    /// Record key sets and sequence lengths match the source, recursively.
    #[test]
    fn merge_converges_key_sets(mut target in node_strategy(), source in node_strategy()) {
        merge(&mut target, &source);
        assert_same_shape(&target, &source)?;
    }

    /// Merging onto an equal tree is a no-op.
    #[test]
    fn merge_onto_equal_tree_is_noop(source in node_strategy()) {
        let mut target = source.clone();
        prop_assert!(merge(&mut target, &source).is_noop());
    }

    /// Changing one top-level field writes exactly that field.
    #[test]
    fn single_field_change_writes_once(
        base in prop::collection::btree_map("[a-f]", leaf_strategy(), 1..6),
        replacement in "[x-z]{1,3}",
    ) {
        let base: Map<String, Value> = base.into_iter().collect();
        let mut target = Value::Object(base.clone());
        let mut source = base;
        let first_key = source.keys().next().cloned().unwrap();
        source.insert(first_key, Value::String(replacement));
        let stats = merge(&mut target, &Value::Object(source));
        prop_assert_eq!(stats.writes, 1);
        prop_assert_eq!(stats.removals, 0);
    }
}
