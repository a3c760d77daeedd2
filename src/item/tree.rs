use super::types::{Item, ItemContent, ItemId, ItemPayload};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

fn describe_parent(parent: &Option<ItemId>) -> String {
    match parent {
        Some(id) => format!("item {id}"),
        None => "the root list".to_string(),
    }
}

/// Reasons a payload could not be merged into the tree.
///
/// Neither case is fatal: callers log the error and keep the existing tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The payload's id is already attached somewhere else.
    #[error(
        "Item {id} is attached under {}, payload places it under {}",
        describe_parent(.existing),
        describe_parent(.claimed)
    )]
    Conflict {
        id: ItemId,
        existing: Option<ItemId>,
        claimed: Option<ItemId>,
    },

    /// The requested parent is not in the tree (e.g. cleared mid-flight).
    #[error("Parent item {0} is not in the tree")]
    UnknownParent(ItemId),
}

/// Structural damage found by [`ItemTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("Item {child} has level {actual}, expected {expected}")]
    Level {
        child: ItemId,
        expected: u32,
        actual: u32,
    },
    #[error("Item {parent} lists child {child} more than once")]
    DuplicateChild { parent: ItemId, child: ItemId },
    #[error("Item {0} is referenced but not stored")]
    Dangling(ItemId),
    #[error("Item {0} is unreachable from the root list")]
    Orphan(ItemId),
    #[error("Item {child} is listed under {listed} but points at {}", describe_parent(.recorded))]
    ParentMismatch {
        child: ItemId,
        listed: ItemId,
        recorded: Option<ItemId>,
    },
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of [`ItemTree::materialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub id: ItemId,
    /// False when an existing node was updated in place.
    pub created: bool,
}

/// Outcome of [`ItemTree::splice_children`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splice {
    /// Children newly attached by this call
    pub added: usize,
    /// `unfetched` left on the node afterwards
    pub remaining: usize,
}

// ============================================================================
// Item Tree
// ============================================================================

/// Arena of materialized items keyed by id.
///
/// Parents are referenced by id rather than by pointer, so the arena owns
/// every node exactly once. Ids are unique across the whole arena: a payload
/// whose id is already attached under a different parent is rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemTree {
    nodes: HashMap<ItemId, Item>,
    roots: Vec<ItemId>,
}

impl ItemTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Root ids in display order.
    pub fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    pub fn root_items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Total number of materialized items across all trees.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    /// Pre-order walk of the subtree rooted at `id`, `id` included.
    pub fn subtree(&self, id: &ItemId) -> Vec<&Item> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(item) = self.nodes.get(next) {
                out.push(item);
                stack.extend(item.children.iter().rev());
            }
        }
        out
    }

    /// Merges `payload` (and its embedded children) under `parent`, or into
    /// the root list when `parent` is `None`.
    ///
    /// A node whose id is already attached under the same parent is updated
    /// in place: content is refreshed, unseen children are appended and
    /// `unfetched` can only go down. Materializing the same payload twice is
    /// therefore a no-op the second time.
    ///
    /// Embedded children that conflict with existing nodes are skipped and
    /// logged; only a conflict on `payload` itself is returned.
    pub fn materialize(
        &mut self,
        payload: &ItemPayload,
        parent: Option<&ItemId>,
    ) -> Result<Materialized, MergeError> {
        let level = match parent {
            Some(parent_id) => match self.nodes.get(parent_id) {
                Some(p) => p.level + 1,
                None => return Err(MergeError::UnknownParent(parent_id.clone())),
            },
            None => 0,
        };

        let created = match self.nodes.get(&payload.id) {
            Some(existing) if existing.parent.as_ref() != parent => {
                return Err(MergeError::Conflict {
                    id: payload.id.clone(),
                    existing: existing.parent.clone(),
                    claimed: parent.cloned(),
                });
            }
            Some(_) => false,
            None => {
                if let Some(hint) = payload.level {
                    if hint != level {
                        tracing::debug!(
                            item = %payload.id,
                            hint,
                            level,
                            "Payload level hint disagrees with tree depth, using tree depth"
                        );
                    }
                }
                self.nodes.insert(
                    payload.id.clone(),
                    Item {
                        id: payload.id.clone(),
                        kind: payload.kind,
                        level,
                        children: Vec::new(),
                        unfetched: payload.total_children,
                        parent: parent.cloned(),
                        content: ItemContent::from_payload(payload),
                    },
                );
                match parent {
                    Some(parent_id) => {
                        if let Some(p) = self.nodes.get_mut(parent_id) {
                            p.children.push(payload.id.clone());
                        }
                    }
                    None => self.roots.push(payload.id.clone()),
                }
                true
            }
        };

        if !created {
            if let Some(node) = self.nodes.get_mut(&payload.id) {
                node.content.absorb(payload);
            }
        }

        let added = self.attach_children(&payload.id, &payload.children);
        if let Some(node) = self.nodes.get_mut(&payload.id) {
            let reported = payload.total_children.saturating_sub(node.children.len());
            node.unfetched = node.unfetched.saturating_sub(added).min(reported);
        }

        Ok(Materialized {
            id: payload.id.clone(),
            created,
        })
    }

    /// Attaches freshly fetched direct children to a frontier node.
    ///
    /// At most `unfetched` new children are accepted; `unfetched` drops by
    /// exactly the number attached. Payloads for children that are already
    /// present are merged in place and do not count.
    pub fn splice_children(
        &mut self,
        id: &ItemId,
        payloads: &[ItemPayload],
    ) -> Result<Splice, MergeError> {
        let mut budget = match self.nodes.get(id) {
            Some(node) => node.unfetched,
            None => return Err(MergeError::UnknownParent(id.clone())),
        };

        let mut added = 0;
        for payload in payloads {
            if budget == 0 && !self.contains(&payload.id) {
                tracing::debug!(
                    item = %id,
                    extra = %payload.id,
                    "Dropping child beyond the unfetched count"
                );
                continue;
            }
            match self.materialize(payload, Some(id)) {
                Ok(m) if m.created => {
                    added += 1;
                    budget -= 1;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(item = %id, error = %e, "Skipping conflicting child"),
            }
        }

        let remaining = match self.nodes.get_mut(id) {
            Some(node) => {
                node.unfetched = node.unfetched.saturating_sub(added);
                node.unfetched
            }
            None => 0,
        };
        Ok(Splice { added, remaining })
    }

    fn attach_children(&mut self, parent: &ItemId, children: &[ItemPayload]) -> usize {
        let mut added = 0;
        for child in children {
            match self.materialize(child, Some(parent)) {
                Ok(m) if m.created => added += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(parent = %parent, error = %e, "Skipping conflicting child")
                }
            }
        }
        added
    }

    /// Checks the structural invariants: levels, parent links, no duplicate
    /// children, everything reachable from the root list.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let mut reached = HashSet::new();
        for root_id in &self.roots {
            let root = self
                .nodes
                .get(root_id)
                .ok_or_else(|| InvariantViolation::Dangling(root_id.clone()))?;
            if root.level != 0 {
                return Err(InvariantViolation::Level {
                    child: root_id.clone(),
                    expected: 0,
                    actual: root.level,
                });
            }
            reached.insert(root_id);
        }

        for node in self.nodes.values() {
            let mut seen = HashSet::new();
            for child_id in &node.children {
                if !seen.insert(child_id) {
                    return Err(InvariantViolation::DuplicateChild {
                        parent: node.id.clone(),
                        child: child_id.clone(),
                    });
                }
                let child = self
                    .nodes
                    .get(child_id)
                    .ok_or_else(|| InvariantViolation::Dangling(child_id.clone()))?;
                if child.parent.as_ref() != Some(&node.id) {
                    return Err(InvariantViolation::ParentMismatch {
                        child: child_id.clone(),
                        listed: node.id.clone(),
                        recorded: child.parent.clone(),
                    });
                }
                if child.level != node.level + 1 {
                    return Err(InvariantViolation::Level {
                        child: child_id.clone(),
                        expected: node.level + 1,
                        actual: child.level,
                    });
                }
            }
        }

        for root_id in &self.roots {
            for item in self.subtree(root_id) {
                reached.insert(&item.id);
            }
        }
        if let Some(orphan) = self.nodes.keys().find(|id| !reached.contains(id)) {
            return Err(InvariantViolation::Orphan(orphan.clone()));
        }
        Ok(())
    }
}
