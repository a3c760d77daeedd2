//! Discussion items and the arena they live in.
//!
//! A story roots a comment tree that is only partially materialized: each
//! node records how many of its direct children are known to exist but have
//! not been fetched yet (`unfetched`). Nodes with hidden children are the
//! *frontier* of the tree and are the only nodes that can be expanded.
//!
//! - [`types`] - identifiers, the wire payload and the materialized [`Item`]
//! - [`tree`] - the [`ItemTree`] arena and its merge rules

mod tree;
mod types;

pub use tree::{InvariantViolation, ItemTree, Materialized, MergeError, Splice};
pub use types::{Item, ItemContent, ItemId, ItemKind, ItemPayload};
