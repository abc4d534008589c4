//! Allocation backtrace tracking.
//!
//! Records a stack trace for every live node so leaks can be traced back to
//! the `allocate` call that created them.

use std::collections::HashMap;

use crate::allocators::slots::NodeId;

/// A captured backtrace for an allocation.
#[derive(Clone)]
pub struct AllocationTrace {
    /// Current handle of the node
    pub node: NodeId,

    /// Current payload size
    pub size: usize,

    /// Captured backtrace
    pub backtrace: String,

    /// Allocation sequence number
    pub sequence: u64,
}

/// Tracker for allocation backtraces, keyed by slot index.
#[derive(Default)]
pub struct BacktraceTracker {
    traces: HashMap<u32, AllocationTrace>,
    sequence: u64,
}

impl BacktraceTracker {
    /// Create a new backtrace tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation with its backtrace.
    pub fn record_alloc(&mut self, node: NodeId, size: usize) {
        self.sequence += 1;
        let trace = AllocationTrace {
            node,
            size,
            backtrace: format!("{:?}", ::backtrace::Backtrace::new()),
            sequence: self.sequence,
        };
        self.traces.insert(node.raw_index(), trace);
    }

    /// Update a record after a resize, which may have issued a new handle.
    pub fn record_resize(&mut self, node: NodeId, size: usize) {
        if let Some(trace) = self.traces.get_mut(&node.raw_index()) {
            trace.node = node;
            trace.size = size;
        }
    }

    /// Remove an allocation record.
    pub fn record_free(&mut self, index: u32) {
        self.traces.remove(&index);
    }

    /// Get all active allocations, oldest first.
    pub fn active_allocations(&self) -> Vec<AllocationTrace> {
        let mut traces: Vec<_> = self.traces.values().cloned().collect();
        traces.sort_by_key(|t| t.sequence);
        traces
    }

    /// Render a leak report.
    pub fn leak_report(&self) -> String {
        if self.traces.is_empty() {
            return "[hieralloc] No live nodes (no leaks detected)\n".to_string();
        }

        let mut report = format!("[hieralloc] Leak report: {} live nodes\n", self.traces.len());
        for trace in self.active_allocations() {
            report.push_str(&format!(
                "  {} ({} bytes, allocation #{})\n{}\n",
                trace.node, trace.size, trace.sequence, trace.backtrace
            ));
        }
        report
    }
}
