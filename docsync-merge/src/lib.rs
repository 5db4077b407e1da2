//! Recursive structural merge for docsync.
//!
//! Patches an existing JSON tree in place so that it ends up equal to a
//! source tree, touching only the values that differ:
//!
//! - [`Shape`]: closed classification of a node (Primitive / Record / Sequence)
//! - [`merge`]: the merge itself, reporting what it changed in [`MergeStats`]
//! - [`deep_update`]: same merge, returning the target for chaining
//!
//! After a merge the target satisfies:
//! - **Equality**: `target == source`
//! - **Key-set convergence**: record key sets and sequence lengths match the source
//! - **Idempotence**: merging the same source again performs no writes

mod merge;
mod shape;

pub use merge::{deep_update, merge, MergeStats};
pub use shape::Shape;
