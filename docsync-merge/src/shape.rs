//! Node classification.

use serde_json::{Map, Value};

/// Closed classification of a JSON node, computed once before recursing.
///
/// `null` is a [`Shape::Primitive`]: it is a terminal value, never a
/// container to recurse into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<'a> {
    /// Terminal value: null, bool, number or string.
    Primitive(&'a Value),
    /// String-keyed mapping.
    Record(&'a Map<String, Value>),
    /// Ordered sequence.
    Sequence(&'a [Value]),
}

impl<'a> Shape<'a> {
    /// Classifies `value`.
    #[must_use]
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Self::Record(map),
            Value::Array(items) => Self::Sequence(items),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Self::Primitive(value)
            }
        }
    }

    /// Returns true for records and sequences.
    #[must_use]
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Primitive(_))
    }
}
