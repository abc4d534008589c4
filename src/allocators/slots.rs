//! Generational slot table backing the node tree.
//!
//! Nodes refer to each other by slot index. Callers hold [`NodeId`]s, which
//! pair the index with a generation so that a handle outliving its node (or
//! a relocated payload) is detected instead of silently aliasing a new one.
//!
//! Each slot also carries an epoch that only advances when the slot is
//! reused. Relocation changes the generation but not the epoch, so a request
//! that names "whatever occupies this slot since it was allocated" (a queued
//! deferred free) survives a relocating resize.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Generation counter for handle validation.
type Generation = u32;

/// Handle to a node in a [`Hierarchy`](crate::Hierarchy).
///
/// Handles are cheap to copy and carry no lifetime. A handle stops being
/// valid when its node is freed, and when a [`resize`](crate::Hierarchy::resize)
/// relocates the node's payload; use the handle returned by that call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: Generation,
    epoch: Generation,
}

impl NodeId {
    /// The absent handle. Never refers to a live node.
    pub const fn dangling() -> Self {
        Self {
            index: u32::MAX,
            generation: 0,
            epoch: 0,
        }
    }

    /// Check if this is the absent handle.
    pub fn is_dangling(&self) -> bool {
        self.index == u32::MAX
    }

    /// Get the raw slot index (for debugging).
    pub fn raw_index(&self) -> u32 {
        self.index
    }

    /// Get the generation (for debugging).
    pub fn raw_generation(&self) -> u32 {
        self.generation
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::dangling()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dangling() {
            write!(f, "NodeId(dangling)")
        } else {
            write!(f, "NodeId({}v{})", self.index, self.generation)
        }
    }
}

struct Slot<T> {
    generation: Generation,
    epoch: Generation,
    value: Option<T>,
}

/// Slot storage with a free list and per-slot generations.
pub(crate) struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
    max_slots: u32,
}

impl<T> SlotTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
            // u32::MAX is the dangling index
            max_slots: u32::MAX,
        }
    }

    #[cfg(test)]
    pub fn with_max_slots(max_slots: u32) -> Self {
        Self {
            max_slots,
            ..Self::with_capacity(0)
        }
    }

    /// Store a value, reusing a freed slot when one is available.
    ///
    /// Returns the value back if every slot index is in use.
    pub fn insert(&mut self, value: T) -> Result<NodeId, T> {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = next_generation(slot.generation);
            slot.epoch = next_generation(slot.epoch);
            slot.value = Some(value);
            self.len += 1;
            return Ok(NodeId {
                index,
                generation: slot.generation,
                epoch: slot.epoch,
            });
        }

        let index = match u32::try_from(self.slots.len()) {
            Ok(index) if index < self.max_slots => index,
            _ => return Err(value),
        };

        self.slots.push(Slot {
            generation: 1,
            epoch: 1,
            value: Some(value),
        });
        self.len += 1;
        Ok(NodeId {
            index,
            generation: 1,
            epoch: 1,
        })
    }

    /// Resolve a handle to its slot index if it is still live.
    pub fn resolve(&self, id: NodeId) -> Option<u32> {
        if id.is_dangling() {
            return None;
        }

        let slot = self.slots.get(id.index as usize)?;
        if slot.value.is_some() && slot.generation == id.generation {
            Some(id.index)
        } else {
            None
        }
    }

    /// Resolve a handle to its slot index if the node it was issued for is
    /// still live, even if a relocation has since replaced the handle.
    pub fn resolve_occupant(&self, id: NodeId) -> Option<u32> {
        if id.is_dangling() {
            return None;
        }

        let slot = self.slots.get(id.index as usize)?;
        if slot.value.is_some() && slot.epoch == id.epoch {
            Some(id.index)
        } else {
            None
        }
    }

    /// Current handle for an occupied slot.
    pub fn id_at(&self, index: u32) -> NodeId {
        let slot = &self.slots[index as usize];
        NodeId {
            index,
            generation: slot.generation,
            epoch: slot.epoch,
        }
    }

    /// Invalidate every outstanding handle to an occupied slot and return
    /// the new one. The stored value is untouched.
    pub fn bump_generation(&mut self, index: u32) -> NodeId {
        let slot = &mut self.slots[index as usize];
        slot.generation = next_generation(slot.generation);
        NodeId {
            index,
            generation: slot.generation,
            epoch: slot.epoch,
        }
    }

    /// Take the value out of an occupied slot and recycle the slot.
    pub fn remove(&mut self, index: u32) -> Option<T> {
        let value = self.slots.get_mut(index as usize)?.value.take()?;
        self.free_list.push(index);
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_slots(&self) -> usize {
        self.free_list.len()
    }
}

/// Generation zero is reserved for the dangling handle.
fn next_generation(generation: Generation) -> Generation {
    match generation.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

impl<T> Index<u32> for SlotTable<T> {
    type Output = T;

    fn index(&self, index: u32) -> &T {
        match self.slots.get(index as usize).and_then(|s| s.value.as_ref()) {
            Some(value) => value,
            None => panic!("slot {} is vacant", index),
        }
    }
}

impl<T> IndexMut<u32> for SlotTable<T> {
    fn index_mut(&mut self, index: u32) -> &mut T {
        match self.slots.get_mut(index as usize).and_then(|s| s.value.as_mut()) {
            Some(value) => value,
            None => panic!("slot {} is vacant", index),
        }
    }
}
