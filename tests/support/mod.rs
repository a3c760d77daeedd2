//! Scripted item source shared by the integration tests.
//!
//! Responses are queued per request kind and served in order. An optional
//! gate holds every request until the test releases it, which is how the
//! concurrency tests keep a fetch in flight.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use threadline::item::{ItemId, ItemPayload};
use threadline::source::{ItemSource, SourceError};
use threadline::store::FeedType;
use tokio::sync::Notify;

type Response = Result<Vec<ItemPayload>, SourceError>;

#[derive(Default)]
pub struct ScriptedSource {
    pages: Mutex<VecDeque<Response>>,
    /// Served before `pages` for a matching feed type
    typed_pages: Mutex<HashMap<FeedType, VecDeque<Response>>>,
    children: Mutex<HashMap<ItemId, VecDeque<Response>>>,
    page_calls: Mutex<Vec<(FeedType, usize, usize)>>,
    child_calls: Mutex<Vec<(ItemId, usize)>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request waits for one `notify_one` on the returned handle.
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let source = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (source, gate)
    }

    pub fn push_page(&self, payloads: Vec<ItemPayload>) {
        self.pages.lock().unwrap().push_back(Ok(payloads));
    }

    pub fn push_page_for(&self, feed_type: FeedType, payloads: Vec<ItemPayload>) {
        self.typed_pages
            .lock()
            .unwrap()
            .entry(feed_type)
            .or_default()
            .push_back(Ok(payloads));
    }

    pub fn push_page_error(&self, error: SourceError) {
        self.pages.lock().unwrap().push_back(Err(error));
    }

    pub fn push_children(&self, id: &str, payloads: Vec<ItemPayload>) {
        self.children
            .lock()
            .unwrap()
            .entry(ItemId::from(id))
            .or_default()
            .push_back(Ok(payloads));
    }

    pub fn push_children_error(&self, id: &str, error: SourceError) {
        self.children
            .lock()
            .unwrap()
            .entry(ItemId::from(id))
            .or_default()
            .push_back(Err(error));
    }

    pub fn page_calls(&self) -> Vec<(FeedType, usize, usize)> {
        self.page_calls.lock().unwrap().clone()
    }

    pub fn child_calls(&self) -> Vec<(ItemId, usize)> {
        self.child_calls.lock().unwrap().clone()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

impl ItemSource for ScriptedSource {
    async fn fetch_page(
        &self,
        feed_type: FeedType,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ItemPayload>, SourceError> {
        self.page_calls
            .lock()
            .unwrap()
            .push((feed_type, offset, limit));
        self.wait_for_gate().await;
        let typed = self
            .typed_pages
            .lock()
            .unwrap()
            .get_mut(&feed_type)
            .and_then(VecDeque::pop_front);
        typed
            .or_else(|| self.pages.lock().unwrap().pop_front())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_children(
        &self,
        id: &ItemId,
        max_count: usize,
    ) -> Result<Vec<ItemPayload>, SourceError> {
        self.child_calls
            .lock()
            .unwrap()
            .push((id.clone(), max_count));
        self.wait_for_gate().await;
        self.children
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// `count` stories with ids `{prefix}{start}..`.
pub fn stories(prefix: &str, start: usize, count: usize) -> Vec<ItemPayload> {
    (start..start + count)
        .map(|i| ItemPayload::story(format!("{prefix}{i}")).with_title(format!("Story {i}")))
        .collect()
}

pub fn comments(ids: &[&str]) -> Vec<ItemPayload> {
    ids.iter().map(|id| ItemPayload::comment(*id)).collect()
}

pub fn ids(items: &[threadline::item::Item]) -> Vec<String> {
    items.iter().map(|i| i.id().to_string()).collect()
}
