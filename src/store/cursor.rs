/// What the top-level feed is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Infinite-scroll fetch in flight
    Loading,
    /// Pull-to-refresh fetch in flight
    Refreshing,
}

/// Pagination state for the top-level feed.
///
/// `is_loading` is the single-flight flag: while it is set no other page
/// request may start. `is_refreshing` is only ever set together with
/// `is_loading` and lets the UI tell a pull-to-refresh from a scroll load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    offset: usize,
    /// Offset to return to if the in-flight page fails
    fallback: usize,
    limit: usize,
    is_loading: bool,
    is_refreshing: bool,
}

impl Cursor {
    /// A zero `limit` is raised to 1 so that pagination always advances.
    pub fn new(limit: usize) -> Self {
        Self {
            offset: 0,
            fallback: 0,
            limit: limit.max(1),
            is_loading: false,
            is_refreshing: false,
        }
    }

    /// Offset of the most recently requested page.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.is_refreshing
    }

    pub fn phase(&self) -> Phase {
        if self.is_refreshing {
            Phase::Refreshing
        } else if self.is_loading {
            Phase::Loading
        } else {
            Phase::Idle
        }
    }

    /// `idle -> loading` for the page at `offset`. Returns false (and changes
    /// nothing) when a fetch is already in flight.
    pub(crate) fn begin_load(&mut self, offset: usize) -> bool {
        if self.is_loading {
            return false;
        }
        self.fallback = self.offset;
        self.offset = offset;
        self.is_loading = true;
        true
    }

    /// `idle -> refreshing`: rewinds to the first page.
    pub(crate) fn begin_refresh(&mut self) -> bool {
        if self.is_loading {
            return false;
        }
        self.offset = 0;
        self.fallback = 0;
        self.is_loading = true;
        self.is_refreshing = true;
        true
    }

    /// Claims the next page for an end-of-list load. Returns its offset, or
    /// `None` while a fetch is in flight.
    pub(crate) fn begin_next_page(&mut self) -> Option<usize> {
        let next = self.offset.saturating_add(self.limit);
        self.begin_load(next).then_some(next)
    }

    /// `loading|refreshing -> idle`, regardless of how the fetch ended.
    pub(crate) fn finish(&mut self) {
        self.is_loading = false;
        self.is_refreshing = false;
    }

    /// Like [`finish`](Self::finish), but also steps back to the offset that
    /// was current before the failed page so the next load retries it.
    pub(crate) fn finish_failed(&mut self) {
        self.offset = self.fallback;
        self.finish();
    }

    pub(crate) fn rewind(&mut self) {
        self.offset = 0;
        self.fallback = 0;
    }
}
