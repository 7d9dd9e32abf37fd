//! The incremental emphasis engine.
//!
//! [`Engine`] owns every piece of mutable state (marks, caches, queues) and
//! is driven by the host through four entry points: microtask turns, frame
//! callbacks, visibility entries and change batches. All of them run on one
//! control flow; nothing here is shared across threads.

use crate::analyzer::WordAnalyzer;
use crate::classify::{CheckSet, Classifier};
use crate::config::EngineOptions;
use crate::error::{ErrorKind, ReadifyError};
use crate::fragment::build_fragment;
use crate::host::Host;
use crate::marks::{Mark, MarkTable};
use crate::order::reading_order;
use crate::scan::scan;
use crate::scheduler::{FrameBatches, Scheduled, Task, TaskQueue};
use crate::tree::{descendants, is_meaningful_text, ContentTree, NodeId, NodeKind};
use crate::visibility::{is_visible, ObserveOutcome, VisibilityGate};
use crate::watch::{process_batch, ChangeRecord, WatchContext};

/// Diagnostic counters accumulated over the engine's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Scan tasks executed.
    pub scans: usize,
    /// Candidates found across all scans.
    pub candidates: usize,
    /// Containers transformed and marked processed.
    pub transformed: usize,
    /// Text nodes replaced by fragments.
    pub text_nodes_rewritten: usize,
    /// Visibility subscriptions registered.
    pub observed: usize,
    /// Observed nodes reported visible by the host.
    pub revealed: usize,
    /// Subscription attempts the host rejected.
    pub subscription_failures: usize,
    /// Scheduled nodes skipped because they were detached.
    pub skipped_detached: usize,
    /// Scheduled nodes no longer eligible at transform time.
    pub skipped_ineligible: usize,
    /// Tasks or transforms that failed with a non-benign error.
    pub failed: usize,
    /// Frame callbacks that did work.
    pub frames: usize,
    /// Change batches received.
    pub change_batches: usize,
}

/// Incremental partial-word emphasis engine bound to one host.
#[derive(Debug)]
pub struct Engine<H: Host> {
    options: EngineOptions,
    host: H,
    analyzer: WordAnalyzer,
    classifier: Classifier,
    marks: MarkTable,
    gate: VisibilityGate,
    tasks: TaskQueue,
    frames: FrameBatches,
    stats: EngineStats,
    root: Option<NodeId>,
}

impl<H: Host> Engine<H> {
    pub fn new(options: EngineOptions, host: H) -> Self {
        let analyzer = WordAnalyzer::new(options.bionic.clone(), &options.cache);
        let classifier = Classifier::new(
            options.selectors.clone(),
            options.cache.max_classification_entries,
        );
        let gate = VisibilityGate::new(options.visibility);
        Self {
            options,
            host,
            analyzer,
            classifier,
            marks: MarkTable::new(),
            gate,
            tasks: TaskQueue::new(),
            frames: FrameBatches::new(),
            stats: EngineStats::default(),
            root: None,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn analyzer(&self) -> &WordAnalyzer {
        &self.analyzer
    }

    pub fn is_running(&self) -> bool {
        self.root.is_some()
    }

    /// Current processing mark of `node`.
    pub fn mark(&self, node: NodeId) -> Mark {
        self.marks.get(node)
    }

    /// Tasks waiting for a microtask turn.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Candidates waiting in frame batches.
    pub fn pending_candidates(&self) -> usize {
        self.frames.pending()
    }

    /// Subscribe to changes under `root` and queue its initial scan.
    ///
    /// A change subscription failure is logged and the initial scan still
    /// runs. Starting a running engine is a no-op.
    pub fn start<T: ContentTree + ?Sized>(
        &mut self,
        tree: &T,
        root: NodeId,
    ) -> Result<(), ReadifyError> {
        if let Some(current) = self.root {
            log::debug!("engine already running on {}", current);
            return Ok(());
        }
        if !tree.is_connected(root) {
            return Err(ReadifyError::detached(root));
        }
        if let Err(err) = self.host.observe_changes(root) {
            self.stats.subscription_failures += 1;
            log::warn!("change subscription failed, scanning once: {}", err);
        }
        self.root = Some(root);
        self.enqueue(Task::Scan(root));
        Ok(())
    }

    /// Disconnect subscriptions, drop queued work and clear every mark.
    ///
    /// Applied transforms stay in the tree. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.host.disconnect();
        self.tasks.clear();
        self.frames.clear();
        self.marks.clear();
        self.classifier.clear();
        if self.root.take().is_some() {
            log::debug!("engine stopped");
        }
    }

    /// Run one queued task. Called by the host once per requested microtask.
    pub fn run_microtask<T: ContentTree + ?Sized>(&mut self, tree: &T) {
        if !self.tasks.is_draining() {
            return;
        }
        if let Some(task) = self.tasks.take_next() {
            if let Err(err) = self.run_task(tree, task) {
                self.record_failure(&err);
            }
        }
        if self.tasks.finish_turn() {
            self.host.queue_microtask();
        }
    }

    /// Transform scheduled candidates until the frame budget or cap is hit.
    pub fn on_frame<T: ContentTree + ?Sized>(&mut self, tree: &mut T) {
        self.frames.begin_frame();
        if self.root.is_none() {
            return;
        }
        let started = self.host.now_ms();
        let budget = self.options.scheduler.frame_budget_ms;
        let cap = self.options.scheduler.max_elements_per_frame.max(1);
        let mut handled = 0usize;
        while handled < cap {
            if handled > 0 && self.host.now_ms() - started >= budget {
                break;
            }
            let Some(item) = self.frames.next() else {
                break;
            };
            handled += 1;
            if let Err(err) = self.process_candidate(tree, item) {
                self.record_failure(&err);
            }
        }
        if handled > 0 {
            self.stats.frames += 1;
        }
        if self.frames.arm() {
            self.host.request_frame();
        }
        log::debug!(
            "frame: {} candidates, {} pending",
            handled,
            self.frames.pending()
        );
    }

    /// Handle intersection entries reported by the host.
    pub fn on_visibility(&mut self, entries: &[NodeId]) {
        if self.root.is_none() {
            return;
        }
        let revealed = self.gate.reveal(&mut self.host, &mut self.marks, entries);
        if revealed.is_empty() {
            return;
        }
        self.stats.revealed += revealed.len();
        self.enqueue(Task::Reveal(revealed));
    }

    /// Handle one batch of change records.
    pub fn on_changes<T: ContentTree + ?Sized>(&mut self, tree: &T, records: &[ChangeRecord]) {
        if self.root.is_none() || records.is_empty() {
            return;
        }
        self.stats.change_batches += 1;
        let plan = process_batch(
            tree,
            records,
            WatchContext {
                host: &mut self.host,
                marks: &mut self.marks,
                classifier: &mut self.classifier,
                gate: &self.gate,
                filter: &self.options.changes,
            },
        );
        log::debug!(
            "changes: {} records, {} removed, {} rescans",
            records.len(),
            plan.removed_roots,
            plan.rescan.len()
        );
        for target in plan.rescan {
            self.enqueue(Task::Scan(target));
        }
    }

    fn enqueue(&mut self, task: Task) {
        if self.tasks.enqueue(task) {
            self.host.queue_microtask();
        }
    }

    fn record_failure(&mut self, err: &ReadifyError) {
        match err.kind {
            ErrorKind::DetachedNode => {
                self.stats.skipped_detached += 1;
                log::trace!("skipped: {}", err);
            }
            ErrorKind::EmptyInput => log::trace!("skipped: {}", err),
            _ => {
                self.stats.failed += 1;
                log::warn!("engine task failed: {}", err);
            }
        }
    }

    fn run_task<T: ContentTree + ?Sized>(
        &mut self,
        tree: &T,
        task: Task,
    ) -> Result<(), ReadifyError> {
        match task {
            Task::Scan(root) => {
                if !tree.is_connected(root) {
                    return Err(ReadifyError::detached(root));
                }
                self.scan_and_schedule(tree, root);
            }
            Task::Reveal(nodes) => {
                if self.frames.push(nodes, false) {
                    self.host.request_frame();
                }
            }
        }
        Ok(())
    }

    fn scan_and_schedule<T: ContentTree + ?Sized>(&mut self, tree: &T, root: NodeId) {
        let result = scan(
            tree,
            root,
            &mut self.classifier,
            &self.marks,
            self.options.visibility.viewport_margin_px,
        );
        self.stats.scans += 1;
        self.stats.candidates += result.len();

        let mut visible = result.visible;
        for node in result.hidden {
            if self.observe_or_fail_open(node) {
                visible.push(node);
            }
        }
        if visible.is_empty() {
            return;
        }
        let ordered = reading_order(tree, &visible, self.options.column_threshold_px);
        if self.frames.push(ordered, true) {
            self.host.request_frame();
        }
    }

    /// Subscribe `node`; returns true when the subscription failed and the
    /// node must be processed as if visible.
    fn observe_or_fail_open(&mut self, node: NodeId) -> bool {
        match self.gate.observe(&mut self.host, &mut self.marks, node) {
            Ok(ObserveOutcome::Subscribed) => {
                self.stats.observed += 1;
                false
            }
            Ok(ObserveOutcome::AlreadyObserved) => false,
            Err(err) => {
                self.stats.subscription_failures += 1;
                log::warn!("visibility subscription failed, processing eagerly: {}", err);
                true
            }
        }
    }

    fn process_candidate<T: ContentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        item: Scheduled,
    ) -> Result<(), ReadifyError> {
        let node = item.node;
        if !tree.is_connected(node) {
            return Err(ReadifyError::detached(node));
        }
        if self.marks.is_processed(node) {
            return Ok(());
        }
        if item.recheck_visibility
            && !is_visible(&*tree, node, self.options.visibility.viewport_margin_px)
            && !self.observe_or_fail_open(node)
        {
            return Ok(());
        }
        self.transform(tree, node)
    }

    fn transform<T: ContentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        node: NodeId,
    ) -> Result<(), ReadifyError> {
        if !self.classifier.is_eligible(&*tree, node, &self.marks) {
            self.stats.skipped_ineligible += 1;
            log::trace!("transform: {} no longer eligible", node);
            return Ok(());
        }

        let mut targets = Vec::new();
        for id in descendants(&*tree, node) {
            if tree.kind(id) != Some(NodeKind::Text) || !tree.text(id).is_some_and(is_meaningful_text)
            {
                continue;
            }
            if self.marks.is_within_processed(&*tree, id)
                || self.classifier.matches(&*tree, id, CheckSet::PRUNE)
            {
                continue;
            }
            targets.push(id);
        }

        let mut rewritten = 0usize;
        for id in targets {
            let Some(text) = tree.text(id) else {
                continue;
            };
            match build_fragment(text, &mut self.analyzer, self.options.markers) {
                Ok(fragment) => {
                    tree.replace_text(id, &fragment)?;
                    rewritten += 1;
                }
                Err(err) if err.is_benign() => {}
                Err(err) => return Err(err),
            }
        }

        if self.marks.set(node, Mark::Processed) == Mark::Observed {
            self.host.unobserve_visibility(node);
        }
        self.stats.transformed += 1;
        self.stats.text_nodes_rewritten += rewritten;
        log::trace!("transform: {} rewrote {} text nodes", node, rewritten);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::sim::SimHost;

    fn engine() -> Engine<SimHost> {
        Engine::new(EngineOptions::default(), SimHost::new())
    }

    #[test]
    fn start_requests_one_microtask_and_is_idempotent() {
        let doc = Document::parse("<p>Hello reader</p>").expect("markup should parse");
        let mut engine = engine();
        engine.start(&doc, doc.root()).expect("start should succeed");
        engine.start(&doc, doc.root()).expect("second start is a no-op");
        assert_eq!(engine.host().pending_microtasks(), 1);
        assert_eq!(engine.pending_tasks(), 1);
        assert!(engine.host().is_watching(doc.root()));
    }

    #[test]
    fn start_rejects_detached_root() {
        let mut doc = Document::new();
        let orphan = doc.create_element("div");
        let err = engine()
            .start(&doc, orphan)
            .expect_err("detached root must be rejected");
        assert_eq!(err.kind, ErrorKind::DetachedNode);
    }

    #[test]
    fn stop_clears_state_and_ignores_late_callbacks() {
        let mut doc = Document::parse("<p>Hello reader</p>").expect("markup should parse");
        doc.layout_blocks(20.0);
        let mut engine = engine();
        engine.start(&doc, doc.root()).expect("start should succeed");
        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.pending_tasks(), 0);

        engine.run_microtask(&doc);
        engine.on_frame(&mut doc);
        assert_eq!(engine.stats().transformed, 0);
        assert_eq!(doc.to_markup(), "<p>Hello reader</p>");
    }
}
