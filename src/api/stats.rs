//! Hierarchy statistics.

use crate::util::size::format_bytes;

/// Counters maintained by a [`Hierarchy`](crate::Hierarchy).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierStats {
    /// Nodes currently live.
    pub live_nodes: usize,

    /// Payload bytes currently live.
    pub live_bytes: usize,

    /// Peak payload bytes (high water mark).
    pub peak_bytes: usize,

    /// Total nodes allocated.
    pub allocation_count: u64,

    /// Total nodes released (including cascaded descendants).
    pub free_count: u64,

    /// Total successful resizes.
    pub resize_count: u64,

    /// Resizes that moved the payload.
    pub relocation_count: u64,

    /// Finalizers invoked.
    pub finalizers_fired: u64,

    /// Allocations or resizes refused for lack of memory.
    pub failed_allocations: u64,
}

impl HierStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_alloc(&mut self, size: usize) {
        self.live_nodes += 1;
        self.allocation_count += 1;
        self.grow(size);
    }

    pub(crate) fn record_release(&mut self, size: usize) {
        self.live_nodes -= 1;
        self.free_count += 1;
        self.live_bytes -= size;
    }

    pub(crate) fn record_resize(&mut self, old_size: usize, new_size: usize, relocated: bool) {
        self.resize_count += 1;
        if relocated {
            self.relocation_count += 1;
        }

        if new_size >= old_size {
            self.grow(new_size - old_size);
        } else {
            self.live_bytes -= old_size - new_size;
        }
    }

    fn grow(&mut self, bytes: usize) {
        self.live_bytes += bytes;
        if self.live_bytes > self.peak_bytes {
            self.peak_bytes = self.live_bytes;
        }
    }

    /// Fraction of resizes that relocated.
    pub fn relocation_ratio(&self) -> f64 {
        if self.resize_count == 0 {
            return 0.0;
        }
        self.relocation_count as f64 / self.resize_count as f64
    }
}

impl std::fmt::Display for HierStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Hierarchy Statistics:")?;
        writeln!(f, "  Live nodes:      {}", self.live_nodes)?;
        writeln!(f, "  Live bytes:      {}", format_bytes(self.live_bytes))?;
        writeln!(f, "  Peak bytes:      {}", format_bytes(self.peak_bytes))?;
        writeln!(f, "  Allocations:     {}", self.allocation_count)?;
        writeln!(f, "  Frees:           {}", self.free_count)?;
        writeln!(f, "  Resizes:         {}", self.resize_count)?;
        writeln!(f, "  Relocations:     {}", self.relocation_count)?;
        writeln!(f, "  Finalizers:      {}", self.finalizers_fired)?;
        writeln!(f, "  Failed:          {}", self.failed_allocations)?;
        Ok(())
    }
}
