//! The stories store: paginated top-level feed plus on-demand expansion of
//! comment subtrees.
//!
//! # State machine
//!
//! The top-level feed moves between `idle`, `loading` and `refreshing`
//! (see [`Cursor`]). Only one page request is ever in flight; requests made
//! while loading are dropped rather than queued.
//!
//! # Staleness
//!
//! Every request remembers the store epoch it was issued under. Clearing,
//! refreshing, switching feed type and disposing bump the epoch, and a
//! response that arrives under a newer epoch is discarded instead of being
//! merged into a list it no longer belongs to. A page load for the current
//! list may start while such a stale load is still outstanding.
//!
//! Switching feed type keeps the loaded tree, so it only invalidates page
//! loads. Expansions are invalidated when the tree itself is dropped.
//!
//! # Example
//!
//! ```ignore
//! use threadline::store::{FeedType, Stories};
//!
//! let stories = Stories::new(source, FeedType::Top, 25);
//! stories.fetch_stories(0, 25).await?;
//! stories.on_end_reached().await?;
//! stories.expand(&story_id).await?;
//! ```

mod cursor;
mod events;
mod expand;
mod feed_type;
mod stories;

pub use cursor::{Cursor, Phase};
pub use events::StoreEvent;
pub use expand::ExpandOutcome;
pub use feed_type::{FeedType, UnknownFeedType};
pub use stories::{FetchOutcome, Stories};

use crate::item::ItemId;
use crate::source::SourceError;
use thiserror::Error;

/// Fetch failures surfaced to the caller.
///
/// A failed request never leaves partial data behind: the root list (or the
/// frontier node) is exactly as it was before the request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to load stories at offset {offset}: {source}")]
    Page { offset: usize, source: SourceError },

    #[error("Failed to load replies for item {id}: {source}")]
    Expansion { id: ItemId, source: SourceError },
}

impl StoreError {
    /// The underlying transport error.
    pub fn source_error(&self) -> &SourceError {
        match self {
            StoreError::Page { source, .. } | StoreError::Expansion { source, .. } => source,
        }
    }

    /// Whether the failure looks like lost connectivity rather than a bad
    /// response, i.e. whether an "offline" indicator is appropriate.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self.source_error(),
            SourceError::Network(_) | SourceError::Timeout
        )
    }
}
