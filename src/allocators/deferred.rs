//! Deferred free queue for frees requested off the owning thread.
//!
//! The tree itself is never shared. Other threads push handles here and
//! the owner drains the queue with
//! [`Hierarchy::process_deferred_frees`](crate::Hierarchy::process_deferred_frees).

use crossbeam_queue::SegQueue;

use super::slots::NodeId;

/// Lock-free queue of pending frees.
#[derive(Default)]
pub struct DeferredFreeQueue {
    queue: SegQueue<NodeId>,
}

impl DeferredFreeQueue {
    /// Create a new deferred free queue.
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    /// Request that `node` be freed the next time the owner drains the queue.
    ///
    /// The request still applies if the owner relocates the node in the
    /// meantime. It is dropped if the node has already been freed.
    pub fn push(&self, node: NodeId) {
        self.queue.push(node);
    }

    /// Pop the oldest pending free.
    pub(crate) fn pop(&self) -> Option<NodeId> {
        self.queue.pop()
    }

    /// Check if there are pending frees.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get approximate number of pending frees.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
