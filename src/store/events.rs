use crate::item::ItemId;
use crate::store::FeedType;

/// Change notifications published by [`Stories`](super::Stories).
///
/// Each event is sent synchronously right after the mutation it describes,
/// so a receiver that reads the store on an event always sees the new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The root list changed (page merged, cleared, refreshed)
    RootsChanged,
    LoadingChanged(bool),
    RefreshingChanged(bool),
    TypeChanged(FeedType),
    /// An item's children, unfetched count or expansion state changed
    ItemChanged(ItemId),
    /// Sent once before the channel closes
    Disposed,
}

/// Capacity of the broadcast channel. Slow receivers observe `Lagged`.
pub(crate) const EVENT_CAPACITY: usize = 256;
