use super::cursor::Cursor;
use super::events::{StoreEvent, EVENT_CAPACITY};
use super::{FeedType, StoreError};
use crate::item::{Item, ItemId, ItemTree};
use crate::source::ItemSource;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Result of a top-level page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was merged; `appended` stories were new to the list.
    Applied { appended: usize },
    /// Not issued: another page is in flight or the store is disposed.
    Skipped,
    /// Issued, but the list was invalidated before the response arrived.
    Stale,
}

pub(super) struct State {
    pub(super) feed_type: FeedType,
    pub(super) cursor: Cursor,
    pub(super) tree: ItemTree,
    /// Bumped whenever the root list is invalidated; page responses check it
    pub(super) epoch: u64,
    /// Bumped whenever the tree itself is dropped; expansions check it
    pub(super) tree_epoch: u64,
    /// Epoch of the page request holding the cursor's loading claim
    load_epoch: u64,
    /// Frontier nodes with an expansion in flight
    pub(super) expanding: HashSet<ItemId>,
    /// `None` once disposed
    pub(super) events: Option<broadcast::Sender<StoreEvent>>,
}

impl State {
    pub(super) fn emit(&self, event: StoreEvent) {
        if let Some(tx) = &self.events {
            // No receivers is fine
            let _ = tx.send(event);
        }
    }

    pub(super) fn is_disposed(&self) -> bool {
        self.events.is_none()
    }

    /// Makes every in-flight request stale, page loads and expansions alike.
    pub(super) fn invalidate(&mut self) {
        self.invalidate_pages();
        self.tree_epoch = self.tree_epoch.wrapping_add(1);
        self.expanding.clear();
    }

    /// Makes in-flight page loads stale. Expansions keep going.
    fn invalidate_pages(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Frees the single-flight claim of a page load issued before the list
    /// was invalidated, so a load for the current list can start.
    fn release_stale_load(&mut self) {
        if self.cursor.is_loading() && self.load_epoch != self.epoch {
            tracing::debug!(
                offset = self.cursor.offset(),
                "Superseding page load for an invalidated list"
            );
            self.finish_load(false);
        }
    }

    fn finish_load(&mut self, failed: bool) {
        let was_refreshing = self.cursor.is_refreshing();
        if failed {
            self.cursor.finish_failed();
        } else {
            self.cursor.finish();
        }
        self.emit(StoreEvent::LoadingChanged(false));
        if was_refreshing {
            self.emit(StoreEvent::RefreshingChanged(false));
        }
    }
}

/// Canonical, de-duplicated list of stories for one feed, and owner of every
/// comment tree hanging off them.
///
/// All methods take `&self`; share the store with `Arc` to drive it from
/// several tasks. The lock is never held across an `.await`.
pub struct Stories<S> {
    source: S,
    state: Mutex<State>,
}

impl<S> Stories<S> {
    pub fn new(source: S, feed_type: FeedType, limit: usize) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            state: Mutex::new(State {
                feed_type,
                cursor: Cursor::new(limit),
                tree: ItemTree::new(),
                epoch: 0,
                tree_epoch: 0,
                load_epoch: 0,
                expanding: HashSet::new(),
                events: Some(tx),
            }),
        }
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Receives a [`StoreEvent`] after every mutation. After
    /// [`dispose`](Self::dispose) the receiver reports `Closed`.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        match &self.lock().events {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Root stories in display order.
    pub fn stories(&self) -> Vec<Item> {
        self.lock().tree.root_items().cloned().collect()
    }

    pub fn item(&self, id: &ItemId) -> Option<Item> {
        self.lock().tree.get(id).cloned()
    }

    /// Copy of the whole forest, for rendering.
    pub fn snapshot(&self) -> ItemTree {
        self.lock().tree.clone()
    }

    pub fn cursor(&self) -> Cursor {
        self.lock().cursor.clone()
    }

    pub fn feed_type(&self) -> FeedType {
        self.lock().feed_type
    }

    pub fn is_loading(&self) -> bool {
        self.lock().cursor.is_loading()
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().cursor.is_refreshing()
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().is_disposed()
    }

    /// Switches the feed category. Returns false when `feed_type` is already
    /// current; otherwise the caller is expected to reset and refetch.
    ///
    /// Loaded stories are kept, and so are expansions in flight under them.
    /// Any page still in flight for the old category will be discarded.
    pub fn set_type(&self, feed_type: FeedType) -> bool {
        let mut state = self.lock();
        if state.is_disposed() || state.feed_type == feed_type {
            return false;
        }
        tracing::debug!(from = %state.feed_type, to = %feed_type, "Feed type changed");
        state.feed_type = feed_type;
        state.invalidate_pages();
        state.emit(StoreEvent::TypeChanged(feed_type));
        true
    }

    /// Empties the list and rewinds pagination to the first page.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.tree.clear();
        state.invalidate();
        state.cursor.rewind();
        state.emit(StoreEvent::RootsChanged);
    }

    /// Closes the event channel and makes every later request a no-op.
    /// Responses still in flight are discarded.
    pub fn dispose(&self) {
        let mut state = self.lock();
        if state.is_disposed() {
            return;
        }
        state.invalidate();
        state.emit(StoreEvent::Disposed);
        state.events = None;
        tracing::debug!("Stories store disposed");
    }
}

impl<S: ItemSource> Stories<S> {
    /// Requests page `[offset, offset + limit)` and appends unseen stories.
    ///
    /// Ignored while another page is in flight, which is what keeps fast
    /// scrolling from stacking up duplicate requests.
    pub async fn fetch_stories(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<FetchOutcome, StoreError> {
        let (feed_type, epoch) = {
            let mut state = self.lock();
            if state.is_disposed() {
                return Ok(FetchOutcome::Skipped);
            }
            state.release_stale_load();
            if !state.cursor.begin_load(offset) {
                tracing::debug!(offset, "Page already in flight, ignoring request");
                return Ok(FetchOutcome::Skipped);
            }
            state.load_epoch = state.epoch;
            state.emit(StoreEvent::LoadingChanged(true));
            (state.feed_type, state.epoch)
        };
        self.load_page(feed_type, epoch, offset, limit).await
    }

    /// Pull-to-refresh: clears the list before refetching the first page so
    /// stale and fresh stories are never shown together.
    pub async fn refresh(&self) -> Result<FetchOutcome, StoreError> {
        let (feed_type, epoch, limit) = {
            let mut state = self.lock();
            if state.is_disposed() {
                return Ok(FetchOutcome::Skipped);
            }
            state.release_stale_load();
            if !state.cursor.begin_refresh() {
                tracing::debug!("Page already in flight, ignoring refresh");
                return Ok(FetchOutcome::Skipped);
            }
            state.tree.clear();
            state.invalidate();
            state.load_epoch = state.epoch;
            state.emit(StoreEvent::RootsChanged);
            state.emit(StoreEvent::LoadingChanged(true));
            state.emit(StoreEvent::RefreshingChanged(true));
            (state.feed_type, state.epoch, state.cursor.limit())
        };
        self.load_page(feed_type, epoch, 0, limit).await
    }

    /// End of the list reached: advance by one page and fetch it, unless a
    /// page is already in flight.
    pub async fn on_end_reached(&self) -> Result<FetchOutcome, StoreError> {
        let (feed_type, epoch, offset, limit) = {
            let mut state = self.lock();
            if state.is_disposed() {
                return Ok(FetchOutcome::Skipped);
            }
            state.release_stale_load();
            let Some(offset) = state.cursor.begin_next_page() else {
                return Ok(FetchOutcome::Skipped);
            };
            state.load_epoch = state.epoch;
            state.emit(StoreEvent::LoadingChanged(true));
            (state.feed_type, state.epoch, offset, state.cursor.limit())
        };
        self.load_page(feed_type, epoch, offset, limit).await
    }

    /// Category switch as the screen performs it: no-op for the current
    /// category, otherwise clear and load the first page.
    pub async fn change_type(&self, feed_type: FeedType) -> Result<FetchOutcome, StoreError> {
        if !self.set_type(feed_type) {
            return Ok(FetchOutcome::Skipped);
        }
        self.clear();
        let limit = self.cursor().limit();
        self.fetch_stories(0, limit).await
    }

    async fn load_page(
        &self,
        feed_type: FeedType,
        epoch: u64,
        offset: usize,
        limit: usize,
    ) -> Result<FetchOutcome, StoreError> {
        let result = self.source.fetch_page(feed_type, offset, limit).await;

        let mut state = self.lock();
        if state.epoch != epoch {
            // A load for the current list may already own the cursor
            if state.load_epoch == epoch {
                state.finish_load(false);
            }
            tracing::debug!(
                feed = %feed_type,
                offset,
                "Discarding page for an invalidated list"
            );
            return Ok(FetchOutcome::Stale);
        }

        let payloads = match result {
            Ok(payloads) => payloads,
            Err(source) => {
                state.finish_load(true);
                tracing::warn!(feed = %feed_type, offset, error = %source, "Failed to load stories");
                return Err(StoreError::Page { offset, source });
            }
        };

        let mut appended = 0;
        for payload in &payloads {
            match state.tree.materialize(payload, None) {
                Ok(m) if m.created => appended += 1,
                Ok(m) => tracing::trace!(item = %m.id, "Story already listed, merged in place"),
                Err(e) => tracing::warn!(error = %e, "Skipping conflicting story"),
            }
        }
        tracing::debug!(
            feed = %feed_type,
            offset,
            received = payloads.len(),
            appended,
            "Merged page"
        );

        if !payloads.is_empty() {
            state.emit(StoreEvent::RootsChanged);
        }
        state.finish_load(false);
        Ok(FetchOutcome::Applied { appended })
    }
}
