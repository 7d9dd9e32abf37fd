//! Deterministic host simulation for tests, benches and demos.
//!
//! [`SimHost`] records what the engine asked for; [`Simulation`] plays the
//! event loop: microtasks first, then change delivery, then one frame, then
//! intersection entries, until nothing is pending.

use core::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{EngineOptions, VisibilityOptions};
use crate::dom::Document;
use crate::engine::Engine;
use crate::error::{ErrorKind, ReadifyError};
use crate::host::Host;
use crate::tree::{ContentTree, NodeId};

/// Upper bound on event-loop steps in [`Simulation::run_until_idle`].
const MAX_STEPS: usize = 100_000;

/// Host double with a manual clock and injectable subscription failures.
#[derive(Debug, Default)]
pub struct SimHost {
    microtasks: usize,
    frame_requested: bool,
    frame_requests: usize,
    clock_ms: Cell<f64>,
    tick_ms: f64,
    visibility: BTreeMap<NodeId, VisibilityOptions>,
    watched: BTreeSet<NodeId>,
    fail_visibility: bool,
    fail_changes: bool,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose clock advances by `tick_ms` on every read.
    pub fn with_tick(tick_ms: f64) -> Self {
        Self {
            tick_ms,
            ..Self::default()
        }
    }

    pub fn fail_visibility(&mut self, fail: bool) {
        self.fail_visibility = fail;
    }

    pub fn fail_changes(&mut self, fail: bool) {
        self.fail_changes = fail;
    }

    pub fn advance(&self, ms: f64) {
        self.clock_ms.set(self.clock_ms.get() + ms);
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks
    }

    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// Total frame requests made by the engine.
    pub fn frame_requests(&self) -> usize {
        self.frame_requests
    }

    pub fn observed_count(&self) -> usize {
        self.visibility.len()
    }

    pub fn is_observed(&self, node: NodeId) -> bool {
        self.visibility.contains_key(&node)
    }

    pub fn is_watching(&self, root: NodeId) -> bool {
        self.watched.contains(&root)
    }

    pub fn take_microtask(&mut self) -> bool {
        if self.microtasks == 0 {
            return false;
        }
        self.microtasks -= 1;
        true
    }

    pub fn take_frame(&mut self) -> bool {
        core::mem::take(&mut self.frame_requested)
    }

    /// Observed nodes currently intersecting the (margin-extended) viewport.
    pub fn intersecting<T: ContentTree + ?Sized>(&self, tree: &T) -> Vec<NodeId> {
        let viewport = tree.viewport();
        self.visibility
            .iter()
            .filter(|(node, options)| {
                let Some(rect) = tree.bounding_rect(**node) else {
                    return false;
                };
                let area = rect.area();
                if area <= 0.0 {
                    return false;
                }
                let top = -options.root_margin_px;
                let bottom = viewport.height + options.root_margin_px;
                let overlap_h = (rect.bottom().min(bottom) - rect.y.max(top)).max(0.0);
                let overlap_w = (rect.right().min(viewport.width) - rect.x.max(0.0)).max(0.0);
                let ratio = overlap_h * overlap_w / area;
                ratio > 0.0 && ratio >= options.threshold
            })
            .map(|(node, _)| *node)
            .collect()
    }
}

impl Host for SimHost {
    fn queue_microtask(&mut self) {
        self.microtasks += 1;
    }

    fn request_frame(&mut self) {
        self.frame_requested = true;
        self.frame_requests += 1;
    }

    fn now_ms(&self) -> f64 {
        let now = self.clock_ms.get();
        self.clock_ms.set(now + self.tick_ms);
        now
    }

    fn observe_visibility(
        &mut self,
        node: NodeId,
        options: &VisibilityOptions,
    ) -> Result<(), ReadifyError> {
        if self.fail_visibility {
            return Err(ReadifyError::new(
                ErrorKind::SubscriptionFailure,
                "SUBSCRIBE_VISIBILITY",
                "visibility observer unavailable",
            ));
        }
        self.visibility.insert(node, *options);
        Ok(())
    }

    fn unobserve_visibility(&mut self, node: NodeId) {
        self.visibility.remove(&node);
    }

    fn observe_changes(&mut self, root: NodeId) -> Result<(), ReadifyError> {
        if self.fail_changes {
            return Err(ReadifyError::new(
                ErrorKind::SubscriptionFailure,
                "SUBSCRIBE_CHANGES",
                "change observer unavailable",
            )
            .with_node(root));
        }
        self.watched.insert(root);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.visibility.clear();
        self.watched.clear();
    }
}

/// A [`Document`] and an [`Engine`] driven by a simulated event loop.
#[derive(Debug)]
pub struct Simulation {
    pub doc: Document,
    pub engine: Engine<SimHost>,
}

impl Simulation {
    pub fn new(doc: Document, options: EngineOptions) -> Self {
        Self::with_host(doc, options, SimHost::new())
    }

    pub fn with_host(doc: Document, options: EngineOptions, host: SimHost) -> Self {
        Self {
            doc,
            engine: Engine::new(options, host),
        }
    }

    /// Start the engine on the document root.
    pub fn start(&mut self) -> Result<(), ReadifyError> {
        let root = self.doc.root();
        self.engine.start(&self.doc, root)
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn scroll_to(&mut self, y: f32) {
        self.doc.scroll_to(y);
    }

    /// Run every pending microtask. Returns how many ran.
    pub fn run_microtasks(&mut self) -> usize {
        let mut ran = 0;
        while self.engine.host_mut().take_microtask() {
            self.engine.run_microtask(&self.doc);
            ran += 1;
        }
        ran
    }

    /// Deliver pending change records as one batch. Returns whether any were delivered.
    pub fn deliver_changes(&mut self) -> bool {
        if !self.doc.has_records() {
            return false;
        }
        let records = self.doc.take_records();
        let watching = self.engine.is_running()
            && !self.engine.host().watched.is_empty();
        if !watching {
            return false;
        }
        self.engine.on_changes(&self.doc, &records);
        true
    }

    /// Run one frame callback if requested.
    pub fn run_frame(&mut self) -> bool {
        if !self.engine.host_mut().take_frame() {
            return false;
        }
        self.engine.on_frame(&mut self.doc);
        true
    }

    /// Deliver intersection entries for observed nodes now in view.
    pub fn deliver_intersections(&mut self) -> bool {
        let entries = self.engine.host().intersecting(&self.doc);
        if entries.is_empty() {
            return false;
        }
        self.engine.on_visibility(&entries);
        true
    }

    /// Drive the event loop until no callback is pending. Returns the step count.
    pub fn run_until_idle(&mut self) -> usize {
        let mut steps = 0;
        while steps < MAX_STEPS {
            let progressed = self.run_microtasks() > 0
                || self.deliver_changes()
                || self.run_frame()
                || self.deliver_intersections();
            if !progressed {
                break;
            }
            steps += 1;
        }
        if steps == MAX_STEPS {
            log::warn!("simulation did not settle after {} steps", MAX_STEPS);
        }
        steps
    }

    /// Run microtasks and change deliveries only (no frames).
    pub fn settle_microtasks(&mut self) {
        while self.run_microtasks() > 0 || self.deliver_changes() {}
    }
}
