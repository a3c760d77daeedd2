use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Stable identifier of a story or comment, as issued by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl FromStr for ItemId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Story,
    Comment,
}

// ============================================================================
// Wire Payload
// ============================================================================

/// One discussion node as returned by the server.
///
/// `total_children` counts every direct child the server knows about;
/// `children` holds the subset embedded in this response. The difference is
/// what becomes the node's `unfetched` count when it is materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub id: ItemId,
    pub kind: ItemKind,
    #[serde(default)]
    pub total_children: usize,
    #[serde(default)]
    pub children: Vec<ItemPayload>,
    /// Nesting depth as reported by the server. Advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    /// Unix timestamp (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

impl ItemPayload {
    pub fn new(id: impl Into<ItemId>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            kind,
            total_children: 0,
            children: Vec::new(),
            level: None,
            title: None,
            by: None,
            text: None,
            url: None,
            score: None,
            time: None,
        }
    }

    pub fn story(id: impl Into<ItemId>) -> Self {
        Self::new(id, ItemKind::Story)
    }

    pub fn comment(id: impl Into<ItemId>) -> Self {
        Self::new(id, ItemKind::Comment)
    }

    pub fn with_total_children(mut self, total: usize) -> Self {
        self.total_children = total;
        self
    }

    /// Embeds already-known children. `total_children` is raised to at least
    /// the number of embedded children.
    pub fn with_children(mut self, children: Vec<ItemPayload>) -> Self {
        self.total_children = self.total_children.max(children.len());
        self.children = children;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

// ============================================================================
// Materialized Item
// ============================================================================

/// Display content carried alongside the tree structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemContent {
    pub title: Option<String>,
    pub by: Option<String>,
    pub text: Option<String>,
    pub url: Option<String>,
    pub score: Option<i64>,
    pub time: Option<i64>,
}

impl ItemContent {
    pub(crate) fn from_payload(payload: &ItemPayload) -> Self {
        Self {
            title: payload.title.clone(),
            by: payload.by.clone(),
            text: payload.text.clone(),
            url: payload.url.clone(),
            score: payload.score,
            time: payload.time,
        }
    }

    /// Takes every field the newer payload supplies. Absent fields keep the
    /// previously known value.
    pub(crate) fn absorb(&mut self, payload: &ItemPayload) {
        if payload.title.is_some() {
            self.title.clone_from(&payload.title);
        }
        if payload.by.is_some() {
            self.by.clone_from(&payload.by);
        }
        if payload.text.is_some() {
            self.text.clone_from(&payload.text);
        }
        if payload.url.is_some() {
            self.url.clone_from(&payload.url);
        }
        if payload.score.is_some() {
            self.score = payload.score;
        }
        if payload.time.is_some() {
            self.time = payload.time;
        }
    }
}

/// A materialized story or comment.
///
/// Structure (`level`, `children`, `unfetched`, `parent`) is only mutated by
/// [`ItemTree`](super::ItemTree); everything else sees read-only snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) id: ItemId,
    pub(crate) kind: ItemKind,
    pub(crate) level: u32,
    pub(crate) children: Vec<ItemId>,
    pub(crate) unfetched: usize,
    pub(crate) parent: Option<ItemId>,
    pub(crate) content: ItemContent,
}

impl Item {
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// True nesting depth: 0 for stories, +1 per comment level. Never clamped.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Materialized direct children in display order.
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    /// Known direct children that have not been fetched yet.
    pub fn unfetched(&self) -> usize {
        self.unfetched
    }

    pub fn parent(&self) -> Option<&ItemId> {
        self.parent.as_ref()
    }

    pub fn content(&self) -> &ItemContent {
        &self.content
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Frontier nodes are the only nodes eligible for expansion.
    pub fn is_frontier(&self) -> bool {
        self.unfetched > 0
    }
}
