//! The hierarchical allocator.
//!
//! Every allocation is a node in a tree. Freeing a node frees its whole
//! subtree: first every finalizer in the subtree fires (deepest nodes first,
//! siblings in creation order, each node's finalizers in registration
//! order), then the subtree is unlinked and every payload is released.

use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

use crate::allocators::deferred::DeferredFreeQueue;
use crate::allocators::raw::{RawAlloc, SystemAlloc};
use crate::allocators::slots::{NodeId, SlotTable};
use crate::debug::poison::poison_freed;
use crate::diagnostics::macros::{ha_debug, ha_trace};
use crate::diagnostics::{DiagnosticSink, Reporter, HA001, HA101, HA102, HA201, HA301};

#[cfg(feature = "debug")]
use crate::debug::backtrace::{AllocationTrace, BacktraceTracker};

use super::config::HierConfig;
use super::error::{HierError, Result};
use super::finalizer::Finalizer;
use super::iter::{post_order, Ancestors, Children};
use super::stats::HierStats;

/// Payload storage owned by a single node.
#[derive(Clone, Copy)]
struct Block {
    ptr: NonNull<u8>,
    size: usize,
}

impl Block {
    fn as_slice(&self) -> &[u8] {
        // SAFETY: the block is live and exclusively owned by its node
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the block is live and exclusively owned by its node
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }
}

/// Head and tail of an ordered sibling list.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ChildList {
    pub head: Option<u32>,
    pub tail: Option<u32>,
    pub len: usize,
}

/// One tree-managed allocation.
pub(crate) struct Node {
    block: Block,
    pub parent: Option<u32>,
    pub prev: Option<u32>,
    pub next: Option<u32>,
    pub children: ChildList,
    finalizers: Vec<Box<dyn Finalizer>>,
}

impl Node {
    fn new(block: Block) -> Self {
        Self {
            block,
            parent: None,
            prev: None,
            next: None,
            children: ChildList::default(),
            finalizers: Vec::new(),
        }
    }
}

/// Outcome of a successful [`Hierarchy::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    /// The payload stayed where it was; the handle is unchanged.
    InPlace(NodeId),
    /// The payload moved; the old handle is no longer valid.
    Relocated(NodeId),
}

impl Resize {
    /// The handle to use from now on.
    pub fn handle(&self) -> NodeId {
        match *self {
            Resize::InPlace(id) | Resize::Relocated(id) => id,
        }
    }

    /// Whether the payload moved.
    pub fn relocated(&self) -> bool {
        matches!(self, Resize::Relocated(_))
    }
}

/// A tree of owned allocations over a flat allocator.
///
/// Not thread safe: a hierarchy belongs to one thread. Other threads can
/// request frees through [`deferred_queue`](Self::deferred_queue).
///
/// Dropping the hierarchy frees every remaining root, so every registered
/// finalizer fires exactly once.
///
/// ```rust
/// use hieralloc::Hierarchy;
///
/// let mut tree = Hierarchy::new();
/// let parent = tree.allocate(None, 10).unwrap();
/// let child = tree.allocate(Some(parent), 20).unwrap();
///
/// assert_eq!(tree.parent(child).unwrap(), Some(parent));
///
/// // Frees the parent and every descendant
/// tree.free(parent).unwrap();
/// assert!(!tree.is_live(child));
/// ```
pub struct Hierarchy<A: RawAlloc = SystemAlloc> {
    nodes: SlotTable<Node>,
    roots: ChildList,
    raw: A,
    config: HierConfig,
    stats: HierStats,
    reporter: Reporter,
    deferred: Arc<DeferredFreeQueue>,
    #[cfg(feature = "debug")]
    traces: BacktraceTracker,
}

impl Hierarchy<SystemAlloc> {
    /// Create a hierarchy over the system allocator with default config.
    pub fn new() -> Self {
        Self::with_config(HierConfig::default())
    }

    /// Create a hierarchy over the system allocator.
    pub fn with_config(config: HierConfig) -> Self {
        Self::with_allocator(SystemAlloc::new(), config)
    }
}

impl Default for Hierarchy<SystemAlloc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: RawAlloc> Hierarchy<A> {
    /// Create a hierarchy over a custom flat allocator.
    pub fn with_allocator(raw: A, config: HierConfig) -> Self {
        Self {
            nodes: SlotTable::with_capacity(config.initial_capacity),
            roots: ChildList::default(),
            raw,
            reporter: Reporter::new(config.strict_mode, config.emit_diagnostics),
            config,
            stats: HierStats::new(),
            deferred: Arc::new(DeferredFreeQueue::new()),
            #[cfg(feature = "debug")]
            traces: BacktraceTracker::new(),
        }
    }

    /// Route diagnostics to a custom sink instead of the default output.
    pub fn set_diagnostic_sink<S>(&mut self, sink: S)
    where
        S: DiagnosticSink + 'static,
    {
        self.reporter.set_sink(Box::new(sink));
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate a zero-filled payload of `size` bytes.
    ///
    /// With no parent the node becomes a new root; otherwise it is appended
    /// as the parent's last child. On error the tree is unchanged.
    pub fn allocate(&mut self, parent: Option<NodeId>, size: usize) -> Result<NodeId> {
        let parent_index = match parent {
            Some(parent) => Some(self.live(parent, "allocate")?),
            None => None,
        };

        self.check_budget(size, "allocate")?;

        let ptr = match self.raw.allocate(size) {
            Some(ptr) => ptr,
            None => {
                self.stats.failed_allocations += 1;
                self.reporter
                    .report(&HA101, &format!("allocate({} bytes)", size));
                return Err(HierError::AllocationFailed { requested: size });
            }
        };

        let id = match self.nodes.insert(Node::new(Block { ptr, size })) {
            Ok(id) => id,
            Err(node) => {
                // SAFETY: the block was just allocated and never handed out
                unsafe { self.raw.release(node.block.ptr, node.block.size) };
                self.stats.failed_allocations += 1;
                self.reporter
                    .report(&HA101, &format!("allocate({} bytes): node table full", size));
                return Err(HierError::AllocationFailed { requested: size });
            }
        };
        self.link_tail(id.raw_index(), parent_index);
        self.stats.record_alloc(size);

        #[cfg(feature = "debug")]
        self.traces.record_alloc(id, size);

        ha_trace!("allocate {} ({} bytes) under {:?}", id, size, parent);
        Ok(id)
    }

    /// Allocate a node holding a copy of `bytes`.
    pub fn allocate_bytes(&mut self, parent: Option<NodeId>, bytes: &[u8]) -> Result<NodeId> {
        let id = self.allocate(parent, bytes.len())?;
        self.nodes[id.raw_index()]
            .block
            .as_mut_slice()
            .copy_from_slice(bytes);
        Ok(id)
    }

    /// Allocate a node holding a copy of the UTF-8 bytes of `text`.
    pub fn allocate_str(&mut self, parent: Option<NodeId>, text: &str) -> Result<NodeId> {
        self.allocate_bytes(parent, text.as_bytes())
    }

    /// Register a finalizer to run when `node` is freed.
    ///
    /// Finalizers of one node run in registration order.
    pub fn add_finalizer<F>(&mut self, node: NodeId, finalizer: F) -> Result<()>
    where
        F: Finalizer + 'static,
    {
        let index = self.live(node, "add_finalizer")?;
        self.nodes[index].finalizers.push(Box::new(finalizer));
        Ok(())
    }

    /// Resize a node's payload, preserving its first `min(old, new)` bytes.
    ///
    /// Bytes gained are zero-filled. If the flat allocator moves the payload,
    /// the node gets a new handle and the old one becomes invalid; the node's
    /// place in the tree, its children and its finalizers are unaffected.
    /// On error nothing changes and `node` stays valid.
    pub fn resize(&mut self, node: NodeId, new_size: usize) -> Result<Resize> {
        let index = self.live(node, "resize")?;
        let old = self.nodes[index].block;

        if new_size == old.size {
            return Ok(Resize::InPlace(node));
        }

        if new_size > old.size {
            self.check_budget(new_size - old.size, "resize")?;
        }

        // SAFETY: old is a live block of exactly old.size bytes from self.raw
        let ptr = match unsafe { self.raw.resize(old.ptr, old.size, new_size) } {
            Some(ptr) => ptr,
            None => {
                self.stats.failed_allocations += 1;
                self.reporter.report(
                    &HA101,
                    &format!("resize({}, {} -> {} bytes)", node, old.size, new_size),
                );
                return Err(HierError::AllocationFailed {
                    requested: new_size,
                });
            }
        };

        if new_size > old.size {
            // SAFETY: the new block holds new_size bytes
            unsafe { ptr.as_ptr().add(old.size).write_bytes(0, new_size - old.size) };
        }

        self.nodes[index].block = Block {
            ptr,
            size: new_size,
        };

        let relocated = ptr != old.ptr;
        self.stats.record_resize(old.size, new_size, relocated);

        let id = if relocated {
            self.nodes.bump_generation(index)
        } else {
            node
        };

        #[cfg(feature = "debug")]
        self.traces.record_resize(id, new_size);

        if relocated {
            ha_trace!("resize {} -> {} relocated to {}", old.size, new_size, id);
            Ok(Resize::Relocated(id))
        } else {
            ha_trace!("resize {} {} -> {} in place", node, old.size, new_size);
            Ok(Resize::InPlace(id))
        }
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    /// Move `node` to the end of `new_parent`'s children.
    ///
    /// A no-op if `node` is already a child of `new_parent`. Fails without
    /// changing anything if `new_parent` is `node` or one of its descendants.
    pub fn adopt(&mut self, new_parent: NodeId, node: NodeId) -> Result<NodeId> {
        let index = self.live(node, "adopt")?;
        let parent_index = self.live(new_parent, "adopt")?;

        if self.nodes[index].parent == Some(parent_index) {
            return Ok(node);
        }

        let mut cursor = Some(parent_index);
        while let Some(ancestor) = cursor {
            if ancestor == index {
                self.reporter
                    .report(&HA201, &format!("adopt({}, {})", new_parent, node));
                return Err(HierError::WouldCycle {
                    node,
                    parent: new_parent,
                });
            }
            cursor = self.nodes[ancestor].parent;
        }

        self.unlink(index);
        self.link_tail(index, Some(parent_index));

        ha_trace!("adopt {} under {}", node, new_parent);
        Ok(node)
    }

    /// Make `node` a root, appended after the existing roots.
    ///
    /// A no-op if `node` is already a root.
    pub fn detach(&mut self, node: NodeId) -> Result<NodeId> {
        let index = self.live(node, "detach")?;

        if self.nodes[index].parent.is_none() {
            return Ok(node);
        }

        self.unlink(index);
        self.link_tail(index, None);

        ha_trace!("detach {}", node);
        Ok(node)
    }

    // =========================================================================
    // Freeing
    // =========================================================================

    /// Free `node` and its entire subtree.
    ///
    /// All finalizers in the subtree fire before any storage is released.
    pub fn free(&mut self, node: NodeId) -> Result<()> {
        let index = self.live(node, "free")?;
        self.free_index(index);
        Ok(())
    }

    /// Free every node, root by root in root order.
    pub fn clear(&mut self) {
        while let Some(root) = self.roots.head {
            self.free_index(root);
        }
    }

    /// Shared handle to this hierarchy's deferred free queue.
    ///
    /// The queue can be sent to other threads; pushed handles are freed by
    /// [`process_deferred_frees`](Self::process_deferred_frees).
    pub fn deferred_queue(&self) -> Arc<DeferredFreeQueue> {
        Arc::clone(&self.deferred)
    }

    /// Free every handle queued so far. Returns the number of subtrees freed.
    ///
    /// A queued handle still reaches its node after a relocating resize.
    /// Nodes that are gone (for instance because an ancestor was freed
    /// first) are skipped.
    pub fn process_deferred_frees(&mut self) -> usize {
        let pending = self.deferred.len();
        let mut freed = 0;

        for _ in 0..pending {
            let Some(node) = self.deferred.pop() else {
                break;
            };

            match self.nodes.resolve_occupant(node) {
                Some(index) => {
                    self.free_index(index);
                    freed += 1;
                }
                None => self
                    .reporter
                    .report(&HA301, &format!("deferred free of {}", node)),
            }
        }

        if freed > 0 {
            ha_debug!("processed {} deferred frees", freed);
        }
        freed
    }

    fn free_index(&mut self, root: u32) {
        let order = post_order(&self.nodes, root);

        // Finalization pass
        for &index in &order {
            let node = &mut self.nodes[index];
            let finalizers = mem::take(&mut node.finalizers);
            let payload = node.block.as_mut_slice();

            for finalizer in finalizers {
                finalizer.finalize(payload);
                self.stats.finalizers_fired += 1;
            }
        }

        self.unlink(root);

        // Deallocation pass
        for &index in &order {
            self.release(index);
        }

        ha_trace!("freed subtree of {} nodes", order.len());
    }

    fn release(&mut self, index: u32) {
        let Some(mut node) = self.nodes.remove(index) else {
            return;
        };

        if self.config.debug_mode {
            poison_freed(node.block.as_mut_slice());
        }

        // SAFETY: the block came from self.raw and is released exactly once
        unsafe { self.raw.release(node.block.ptr, node.block.size) };
        self.stats.record_release(node.block.size);

        #[cfg(feature = "debug")]
        self.traces.record_free(index);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check if a handle refers to a live node.
    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes.resolve(node).is_some()
    }

    /// The node's parent, or `None` for a root.
    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        let index = self.live(node, "parent")?;
        Ok(self.nodes[index].parent.map(|p| self.nodes.id_at(p)))
    }

    /// The node's children, oldest first.
    pub fn children(&self, node: NodeId) -> Result<Children<'_>> {
        let index = self.live(node, "children")?;
        let list = self.nodes[index].children;
        Ok(Children::new(&self.nodes, list.head, list.len))
    }

    /// Number of direct children.
    pub fn child_count(&self, node: NodeId) -> Result<usize> {
        let index = self.live(node, "child_count")?;
        Ok(self.nodes[index].children.len)
    }

    /// The node's ancestors, nearest first.
    pub fn ancestors(&self, node: NodeId) -> Result<Ancestors<'_>> {
        let index = self.live(node, "ancestors")?;
        Ok(Ancestors::new(&self.nodes, self.nodes[index].parent))
    }

    /// The node and its descendants in the order their finalizers would fire.
    pub fn subtree(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let index = self.live(node, "subtree")?;
        Ok(post_order(&self.nodes, index)
            .into_iter()
            .map(|i| self.nodes.id_at(i))
            .collect())
    }

    /// All roots, oldest first.
    pub fn roots(&self) -> Children<'_> {
        Children::new(&self.nodes, self.roots.head, self.roots.len)
    }

    /// Read a node's payload.
    pub fn payload(&self, node: NodeId) -> Result<&[u8]> {
        let index = self.live(node, "payload")?;
        Ok(self.nodes[index].block.as_slice())
    }

    /// Write a node's payload.
    pub fn payload_mut(&mut self, node: NodeId) -> Result<&mut [u8]> {
        let index = self.live(node, "payload_mut")?;
        Ok(self.nodes[index].block.as_mut_slice())
    }

    /// Payload size in bytes.
    pub fn size(&self, node: NodeId) -> Result<usize> {
        let index = self.live(node, "size")?;
        Ok(self.nodes[index].block.size)
    }

    /// Number of finalizers registered on a node.
    pub fn finalizer_count(&self, node: NodeId) -> Result<usize> {
        let index = self.live(node, "finalizer_count")?;
        Ok(self.nodes[index].finalizers.len())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no nodes are live.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    /// Number of node slots ever created, live or recycled.
    pub fn slot_capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Number of recycled slots waiting for reuse.
    pub fn free_slots(&self) -> usize {
        self.nodes.free_slots()
    }

    /// Current statistics.
    pub fn stats(&self) -> &HierStats {
        &self.stats
    }

    /// Active configuration.
    pub fn config(&self) -> &HierConfig {
        &self.config
    }

    /// The underlying flat allocator.
    pub fn allocator(&self) -> &A {
        &self.raw
    }

    /// Allocation backtraces of every live node, oldest first.
    #[cfg(feature = "debug")]
    pub fn live_traces(&self) -> Vec<AllocationTrace> {
        self.traces.active_allocations()
    }

    /// Render a report of every live node and where it was allocated.
    #[cfg(feature = "debug")]
    pub fn leak_report(&self) -> String {
        self.traces.leak_report()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn live(&self, node: NodeId, op: &str) -> Result<u32> {
        match self.nodes.resolve(node) {
            Some(index) => Ok(index),
            None => {
                self.reporter.report(&HA001, &format!("{}({})", op, node));
                Err(HierError::InvalidHandle(node))
            }
        }
    }

    fn check_budget(&mut self, additional: usize, op: &str) -> Result<()> {
        let limit = self.config.memory_limit;
        if limit == 0 {
            return Ok(());
        }

        let live = self.stats.live_bytes;
        match live.checked_add(additional) {
            Some(total) if total <= limit => Ok(()),
            _ => {
                self.stats.failed_allocations += 1;
                self.reporter.report(
                    &HA102,
                    &format!("{}({} bytes) with {} of {} live", op, additional, live, limit),
                );
                Err(HierError::MemoryLimitExceeded {
                    requested: additional,
                    live,
                    limit,
                })
            }
        }
    }

    fn list(&self, parent: Option<u32>) -> ChildList {
        match parent {
            Some(p) => self.nodes[p].children,
            None => self.roots,
        }
    }

    fn list_mut(&mut self, parent: Option<u32>) -> &mut ChildList {
        match parent {
            Some(p) => &mut self.nodes[p].children,
            None => &mut self.roots,
        }
    }

    /// Append an unlinked node to the tail of a sibling list.
    fn link_tail(&mut self, index: u32, parent: Option<u32>) {
        let tail = self.list(parent).tail;

        let node = &mut self.nodes[index];
        node.parent = parent;
        node.prev = tail;
        node.next = None;

        match tail {
            Some(t) => self.nodes[t].next = Some(index),
            None => self.list_mut(parent).head = Some(index),
        }

        let list = self.list_mut(parent);
        list.tail = Some(index);
        list.len += 1;
    }

    /// Remove a node from its sibling list, patching head, tail and neighbours.
    fn unlink(&mut self, index: u32) {
        let (parent, prev, next) = {
            let node = &self.nodes[index];
            (node.parent, node.prev, node.next)
        };

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.list_mut(parent).head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.list_mut(parent).tail = prev,
        }
        self.list_mut(parent).len -= 1;

        let node = &mut self.nodes[index];
        node.parent = None;
        node.prev = None;
        node.next = None;
    }
}

impl<A: RawAlloc> Drop for Hierarchy<A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<A: RawAlloc> fmt::Debug for Hierarchy<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hierarchy")
            .field("live_nodes", &self.nodes.len())
            .field("roots", &self.roots.len)
            .field("live_bytes", &self.stats.live_bytes)
            .field("config", &self.config)
            .finish()
    }
}
