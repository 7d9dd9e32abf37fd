//! Viewport checks and the visibility gate for deferred candidates.

use crate::config::VisibilityOptions;
use crate::error::ReadifyError;
use crate::host::Host;
use crate::marks::{Mark, MarkTable};
use crate::tree::{ContentTree, NodeId};

/// True when `node` is rendered and within `margin_px` of the viewport.
pub fn is_visible<T: ContentTree + ?Sized>(tree: &T, node: NodeId, margin_px: f32) -> bool {
    if tree.computed_style(node, "display") == Some("none")
        || tree.computed_style(node, "visibility") == Some("hidden")
    {
        return false;
    }
    let Some(rect) = tree.bounding_rect(node) else {
        return false;
    };
    if rect.is_empty() {
        return false;
    }
    let viewport = tree.viewport();
    rect.y <= viewport.height + margin_px && rect.bottom() >= -margin_px
}

/// Outcome of [`VisibilityGate::observe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserveOutcome {
    /// A new subscription was registered.
    Subscribed,
    /// The node already had one.
    AlreadyObserved,
}

/// Defers hidden candidates until the host reports them intersecting.
#[derive(Clone, Debug)]
pub struct VisibilityGate {
    options: VisibilityOptions,
}

impl VisibilityGate {
    pub fn new(options: VisibilityOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VisibilityOptions {
        &self.options
    }

    /// Subscribe `node` and mark it observed.
    ///
    /// On error the node is left unmarked; the caller decides how to fail open.
    pub fn observe<H: Host + ?Sized>(
        &self,
        host: &mut H,
        marks: &mut MarkTable,
        node: NodeId,
    ) -> Result<ObserveOutcome, ReadifyError> {
        if marks.is_observed(node) {
            return Ok(ObserveOutcome::AlreadyObserved);
        }
        host.observe_visibility(node, &self.options)
            .map_err(|err| err.with_node(node))?;
        marks.set(node, Mark::Observed);
        Ok(ObserveOutcome::Subscribed)
    }

    /// Drop the subscription of `node` if it has one. Returns whether it did.
    pub fn release<H: Host + ?Sized>(
        &self,
        host: &mut H,
        marks: &mut MarkTable,
        node: NodeId,
    ) -> bool {
        if !marks.is_observed(node) {
            return false;
        }
        marks.set(node, Mark::Unprocessed);
        host.unobserve_visibility(node);
        true
    }

    /// Handle intersection entries; returns the nodes to schedule, in entry order.
    ///
    /// Entries for nodes no longer observed are stale and dropped.
    pub fn reveal<H: Host + ?Sized>(
        &self,
        host: &mut H,
        marks: &mut MarkTable,
        entries: &[NodeId],
    ) -> Vec<NodeId> {
        let mut revealed = Vec::with_capacity(entries.len());
        for &node in entries {
            if !marks.is_observed(node) {
                log::trace!("visibility: stale entry for {}", node);
                continue;
            }
            host.unobserve_visibility(node);
            marks.set(node, Mark::Unprocessed);
            revealed.push(node);
        }
        revealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimHost;

    #[test]
    fn observe_is_single_subscription_per_node() {
        let gate = VisibilityGate::new(VisibilityOptions::default());
        let mut host = SimHost::new();
        let mut marks = MarkTable::new();
        let node = NodeId::new(4);

        assert_eq!(
            gate.observe(&mut host, &mut marks, node),
            Ok(ObserveOutcome::Subscribed)
        );
        assert_eq!(
            gate.observe(&mut host, &mut marks, node),
            Ok(ObserveOutcome::AlreadyObserved)
        );
        assert_eq!(host.observed_count(), 1);

        let revealed = gate.reveal(&mut host, &mut marks, &[node, node]);
        assert_eq!(revealed, vec![node]);
        assert_eq!(host.observed_count(), 0);
        assert_eq!(marks.get(node), Mark::Unprocessed);
    }

    #[test]
    fn release_drops_only_observed_nodes() {
        let gate = VisibilityGate::new(VisibilityOptions::default());
        let mut host = SimHost::new();
        let mut marks = MarkTable::new();
        let observed = NodeId::new(5);
        let processed = NodeId::new(6);
        gate.observe(&mut host, &mut marks, observed)
            .expect("subscription should succeed");
        marks.set(processed, Mark::Processed);

        assert!(gate.release(&mut host, &mut marks, observed));
        assert!(!gate.release(&mut host, &mut marks, observed));
        assert!(!gate.release(&mut host, &mut marks, processed));
        assert!(!host.is_observed(observed));
        assert_eq!(marks.get(observed), Mark::Unprocessed);
        assert_eq!(marks.get(processed), Mark::Processed);
    }

    #[test]
    fn failed_subscription_leaves_node_unmarked() {
        let gate = VisibilityGate::new(VisibilityOptions::default());
        let mut host = SimHost::new();
        host.fail_visibility(true);
        let mut marks = MarkTable::new();
        let err = gate
            .observe(&mut host, &mut marks, NodeId::new(2))
            .expect_err("subscription should fail");
        assert_eq!(err.node, Some(NodeId::new(2)));
        assert!(marks.is_empty());
    }
}
