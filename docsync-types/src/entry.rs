//! Tracked documents.
//!
//! An [`Entry`] mirrors one remotely stored document locally. The payload is
//! an untyped JSON tree; [`Doc<T>`] is the typed view obtained through serde.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-owned ordered list of entries, unique by identifier.
///
/// Order is significant and caller-visible; the reconciler mutates it in
/// place.
pub type TrackedSequence = Vec<Entry>;

fn default_exists() -> bool {
    true
}

/// One identifier + value pair tracked locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Document identifier assigned by the backing store.
    pub id: String,
    /// Document payload (`null` when the document does not exist).
    pub data: Value,
    /// Whether the document currently exists in the store.
    #[serde(default = "default_exists")]
    pub exists: bool,
}

impl Entry {
    /// Creates an entry for an existing document.
    #[must_use]
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
            exists: true,
        }
    }

    /// Creates the placeholder for a document that does not exist.
    #[must_use]
    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: Value::Null,
            exists: false,
        }
    }

    /// Returns true if the entry holds a document payload.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.exists && !self.data.is_null()
    }

    /// Decodes the payload into `T`.
    ///
    /// Fails with [`Error::Missing`] when the document does not exist; use
    /// `T = Option<U>` to accept missing documents.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Doc<T>> {
        if !self.exists && self.data.is_null() {
            // Option<U> accepts null, everything else reports the document id.
            return match serde_json::from_value::<T>(Value::Null) {
                Ok(data) => Ok(Doc {
                    id: self.id.clone(),
                    data,
                    exists: false,
                }),
                Err(_) => Err(Error::Missing {
                    id: self.id.clone(),
                }),
            };
        }
        Ok(Doc {
            id: self.id.clone(),
            data: serde_json::from_value(self.data.clone())?,
            exists: self.exists,
        })
    }
}

/// Typed view of an [`Entry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc<T> {
    pub id: String,
    pub data: T,
    #[serde(default = "default_exists")]
    pub exists: bool,
}

impl<T> Doc<T> {
    /// Creates a typed document that exists.
    #[must_use]
    pub fn new(id: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            data,
            exists: true,
        }
    }
}

impl<T: Serialize> Doc<T> {
    /// Encodes the typed document back into an untyped [`Entry`].
    ///
    /// Useful for pre-seeding a [`TrackedSequence`] before watching.
    pub fn encode(&self) -> Result<Entry> {
        Ok(Entry {
            id: self.id.clone(),
            data: serde_json::to_value(&self.data)?,
            exists: self.exists,
        })
    }
}
