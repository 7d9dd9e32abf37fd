//! Processing marks kept in a side table keyed by node id.

use std::collections::HashMap;

use crate::tree::{descendants, ContentTree, NodeId};

/// Per-node processing state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mark {
    #[default]
    Unprocessed,
    /// Transformed; never re-entered by the scanner.
    Processed,
    /// Hidden candidate with one outstanding visibility subscription.
    Observed,
}

/// Side table of marks. Absent entries read as [`Mark::Unprocessed`].
#[derive(Clone, Debug, Default)]
pub struct MarkTable {
    marks: HashMap<NodeId, Mark>,
}

impl MarkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Mark {
        self.marks.get(&node).copied().unwrap_or_default()
    }

    /// Set the mark, returning the previous one.
    pub fn set(&mut self, node: NodeId, mark: Mark) -> Mark {
        let previous = match mark {
            Mark::Unprocessed => self.marks.remove(&node),
            other => self.marks.insert(node, other),
        };
        previous.unwrap_or_default()
    }

    pub fn is_processed(&self, node: NodeId) -> bool {
        self.get(node) == Mark::Processed
    }

    pub fn is_observed(&self, node: NodeId) -> bool {
        self.get(node) == Mark::Observed
    }

    /// True when `node` or any ancestor is processed.
    pub fn is_within_processed<T: ContentTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        if self.marks.is_empty() {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if self.is_processed(id) {
                return true;
            }
            current = tree.parent(id);
        }
        false
    }

    /// Reset every mark in the subtree of `root`. Returns how many were set.
    pub fn clear_subtree<T: ContentTree + ?Sized>(&mut self, tree: &T, root: NodeId) -> usize {
        if self.marks.is_empty() {
            return 0;
        }
        descendants(tree, root)
            .filter(|id| self.set(*id, Mark::Unprocessed) != Mark::Unprocessed)
            .count()
    }

    /// Nodes currently marked observed.
    pub fn observed(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.marks
            .iter()
            .filter(|(_, mark)| **mark == Mark::Observed)
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }
}
