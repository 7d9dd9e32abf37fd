//! Change watcher: turns mutation batches into cleanup and re-scan targets.

use std::collections::HashSet;

use crate::classify::{CheckSet, Classifier};
use crate::config::ChangeFilter;
use crate::host::Host;
use crate::marks::MarkTable;
use crate::tree::{descendants, element_of, ContentTree, NodeId};
use crate::visibility::VisibilityGate;

/// What changed on a record's target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// Children of the target were added and/or removed.
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// An attribute of the target element changed.
    Attribute { name: String },
    /// The character data of a text target changed.
    CharacterData,
}

/// One mutation record.
///
/// Removed nodes must stay readable (their own subtree links intact) until
/// the batch carrying their record has been delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRecord {
    pub target: NodeId,
    pub kind: ChangeKind,
}

impl ChangeRecord {
    pub fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            target,
            kind: ChangeKind::ChildList { added, removed },
        }
    }

    pub fn attribute(target: NodeId, name: impl Into<String>) -> Self {
        Self {
            target,
            kind: ChangeKind::Attribute { name: name.into() },
        }
    }

    pub fn character_data(target: NodeId) -> Self {
        Self {
            target,
            kind: ChangeKind::CharacterData,
        }
    }
}

/// Result of processing one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangePlan {
    /// Elements to re-scan, deduplicated, in first-seen order.
    pub rescan: Vec<NodeId>,
    /// Visibility subscriptions dropped because their node was removed.
    pub released: usize,
    /// Nodes whose marks were reset by removal.
    pub removed_roots: usize,
}

/// Mutable engine state the watcher touches.
pub struct WatchContext<'a, H: Host + ?Sized> {
    pub host: &'a mut H,
    pub marks: &'a mut MarkTable,
    pub classifier: &'a mut Classifier,
    pub gate: &'a VisibilityGate,
    pub filter: &'a ChangeFilter,
}

/// Apply removal cleanup for `records` and compute re-scan targets.
pub fn process_batch<T, H>(tree: &T, records: &[ChangeRecord], cx: WatchContext<'_, H>) -> ChangePlan
where
    T: ContentTree + ?Sized,
    H: Host + ?Sized,
{
    let mut plan = ChangePlan::default();

    for record in records {
        if let ChangeKind::ChildList { removed, .. } = &record.kind {
            for &node in removed {
                for id in descendants(tree, node) {
                    if cx.gate.release(cx.host, cx.marks, id) {
                        plan.released += 1;
                    }
                }
                cx.marks.clear_subtree(tree, node);
                cx.classifier.invalidate_subtree(tree, node);
                plan.removed_roots += 1;
            }
        }
    }

    let mut seen = HashSet::new();
    for record in records {
        if let ChangeKind::Attribute { name } = &record.kind {
            if !cx.filter.accepts_attribute(name) {
                log::trace!("watch: ignore attribute {} on {}", name, record.target);
                continue;
            }
            cx.classifier.invalidate_subtree(tree, record.target);
        }
        let Some(target) = element_of(tree, record.target) else {
            continue;
        };
        if !seen.insert(target) || !tree.is_connected(target) {
            continue;
        }
        if cx.marks.is_within_processed(tree, target)
            || cx.classifier.matches(tree, target, CheckSet::PRUNE)
        {
            continue;
        }
        plan.rescan.push(target);
    }
    plan
}
