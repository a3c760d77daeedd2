use super::events::StoreEvent;
use super::{Stories, StoreError};
use crate::item::ItemId;
use crate::source::ItemSource;

/// Result of a "load more replies" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// `added` children were spliced in; `remaining` are still hidden.
    Expanded { added: usize, remaining: usize },
    /// The item has no hidden children (or is unknown). Nothing was fetched.
    NotFrontier,
    /// An expansion of this item is already in flight. Nothing was fetched.
    InProgress,
    /// The tree was invalidated before the response arrived.
    Stale,
}

impl<S: ItemSource> Stories<S> {
    /// Fetches the hidden direct children of frontier item `id` and appends
    /// them in server order, one level below it.
    ///
    /// Only this item changes. Its `unfetched` count drops by exactly the
    /// number of children added, so a short response leaves the remainder
    /// expandable. On failure the item is untouched and can be expanded again.
    pub async fn expand(&self, id: &ItemId) -> Result<ExpandOutcome, StoreError> {
        let (max_count, epoch) = {
            let mut state = self.lock();
            if state.is_disposed() {
                return Ok(ExpandOutcome::Stale);
            }
            let unfetched = match state.tree.get(id) {
                Some(item) => item.unfetched(),
                None => {
                    tracing::debug!(item = %id, "Expansion requested for unknown item");
                    return Ok(ExpandOutcome::NotFrontier);
                }
            };
            if unfetched == 0 {
                return Ok(ExpandOutcome::NotFrontier);
            }
            if !state.expanding.insert(id.clone()) {
                tracing::debug!(item = %id, "Expansion already in flight");
                return Ok(ExpandOutcome::InProgress);
            }
            state.emit(StoreEvent::ItemChanged(id.clone()));
            (unfetched, state.tree_epoch)
        };

        let result = self.source().fetch_children(id, max_count).await;

        let mut state = self.lock();
        if state.tree_epoch != epoch {
            // Invalidation already dropped the in-flight marker
            tracing::debug!(item = %id, "Discarding replies for an invalidated tree");
            return Ok(ExpandOutcome::Stale);
        }
        state.expanding.remove(id);

        let payloads = match result {
            Ok(payloads) => payloads,
            Err(source) => {
                state.emit(StoreEvent::ItemChanged(id.clone()));
                tracing::warn!(item = %id, error = %source, "Failed to load replies");
                return Err(StoreError::Expansion {
                    id: id.clone(),
                    source,
                });
            }
        };

        let outcome = match state.tree.splice_children(id, &payloads) {
            Ok(splice) => {
                tracing::debug!(
                    item = %id,
                    received = payloads.len(),
                    added = splice.added,
                    remaining = splice.remaining,
                    "Expanded replies"
                );
                ExpandOutcome::Expanded {
                    added: splice.added,
                    remaining: splice.remaining,
                }
            }
            Err(e) => {
                tracing::warn!(item = %id, error = %e, "Expanded item left the tree");
                ExpandOutcome::Stale
            }
        };
        state.emit(StoreEvent::ItemChanged(id.clone()));
        Ok(outcome)
    }
}

impl<S> Stories<S> {
    /// Whether an expansion of `id` is in flight (the UI shows a spinner
    /// instead of the "more replies" control).
    pub fn is_expanding(&self, id: &ItemId) -> bool {
        self.lock().expanding.contains(id)
    }
}
