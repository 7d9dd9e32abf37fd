//! Cooperative task queue and frame-budgeted candidate batches.
//!
//! Both queues are plain data: they only say *when* the host should be asked
//! for a callback. The engine owns them and runs the work.

use std::collections::{HashSet, VecDeque};

use crate::tree::NodeId;

/// Deferred unit of engine work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Task {
    /// Scan the subtree of a node for candidates.
    Scan(NodeId),
    /// Schedule nodes reported visible by the host.
    Reveal(Vec<NodeId>),
}

/// FIFO of tasks drained one per microtask turn.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
    draining: bool,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task`. Returns true when the caller must request a microtask.
    pub fn enqueue(&mut self, task: Task) -> bool {
        self.tasks.push_back(task);
        self.arm()
    }

    /// Next task for the current turn, if a turn is armed.
    pub fn take_next(&mut self) -> Option<Task> {
        if !self.draining {
            return None;
        }
        self.tasks.pop_front()
    }

    /// End the current turn. Returns true when another microtask is needed.
    pub fn finish_turn(&mut self) -> bool {
        self.draining = false;
        self.arm()
    }

    fn arm(&mut self) -> bool {
        if self.draining || self.tasks.is_empty() {
            return false;
        }
        self.draining = true;
        true
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop queued tasks without running them.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.draining = false;
    }
}

#[derive(Debug)]
struct Batch {
    nodes: VecDeque<NodeId>,
    recheck_visibility: bool,
}

/// Candidate popped from [`FrameBatches::next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheduled {
    pub node: NodeId,
    /// Re-evaluate visibility before transforming.
    pub recheck_visibility: bool,
}

/// Ordered candidate batches processed across frame callbacks.
///
/// Batches are served strictly in arrival order; a node is held by at most one
/// pending batch.
#[derive(Debug, Default)]
pub struct FrameBatches {
    batches: VecDeque<Batch>,
    in_flight: HashSet<NodeId>,
    frame_scheduled: bool,
}

impl FrameBatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch. Returns true when the caller must request a frame.
    pub fn push(&mut self, nodes: Vec<NodeId>, recheck_visibility: bool) -> bool {
        let nodes: VecDeque<NodeId> = nodes
            .into_iter()
            .filter(|node| self.in_flight.insert(*node))
            .collect();
        if nodes.is_empty() {
            return false;
        }
        self.batches.push_back(Batch {
            nodes,
            recheck_visibility,
        });
        self.arm()
    }

    /// Mark the requested frame as delivered.
    pub fn begin_frame(&mut self) {
        self.frame_scheduled = false;
    }

    pub fn next(&mut self) -> Option<Scheduled> {
        loop {
            let batch = self.batches.front_mut()?;
            if let Some(node) = batch.nodes.pop_front() {
                self.in_flight.remove(&node);
                return Some(Scheduled {
                    node,
                    recheck_visibility: batch.recheck_visibility,
                });
            }
            self.batches.pop_front();
        }
    }

    /// Re-arm after a frame. Returns true when another frame is needed.
    pub fn arm(&mut self) -> bool {
        if self.frame_scheduled || self.in_flight.is_empty() {
            return false;
        }
        self.frame_scheduled = true;
        true
    }

    pub fn is_frame_scheduled(&self) -> bool {
        self.frame_scheduled
    }

    /// Nodes waiting across all batches.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
        self.in_flight.clear();
        self.frame_scheduled = false;
    }
}
