//! Flat allocators used by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ptr::NonNull;
use std::rc::Rc;

use hieralloc::{RawAlloc, SystemAlloc};

/// Capacity of every block handed out by [`TestAlloc::in_place`].
pub const IN_PLACE_CAPACITY: usize = 256;

/// Wraps [`SystemAlloc`] with a switch that makes every request fail, an
/// option to force every resize to move or to never move, and bookkeeping
/// of live blocks and released contents.
#[derive(Default)]
pub struct TestAlloc {
    inner: SystemAlloc,
    pub exhausted: Cell<bool>,
    pub always_move: bool,
    pub never_move: bool,
    pub live_blocks: Rc<Cell<usize>>,
    pub released: RefCell<Vec<Vec<u8>>>,
    capacities: HashMap<usize, usize>,
}

impl TestAlloc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every resize relocates.
    pub fn moving() -> Self {
        Self {
            always_move: true,
            ..Self::default()
        }
    }

    /// Every block reserves `IN_PLACE_CAPACITY` bytes and resizes within it
    /// never move. Growing past the capacity fails.
    pub fn in_place() -> Self {
        Self {
            never_move: true,
            ..Self::default()
        }
    }

    fn capacity_of(&self, ptr: NonNull<u8>, size: usize) -> usize {
        self.capacities
            .get(&(ptr.as_ptr() as usize))
            .copied()
            .unwrap_or(size)
    }
}

unsafe impl RawAlloc for TestAlloc {
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        if self.exhausted.get() {
            return None;
        }

        let ptr = if self.never_move {
            let capacity = size.max(IN_PLACE_CAPACITY);
            let ptr = self.inner.allocate(capacity)?;
            self.capacities.insert(ptr.as_ptr() as usize, capacity);
            ptr
        } else {
            self.inner.allocate(size)?
        };

        self.live_blocks.set(self.live_blocks.get() + 1);
        Some(ptr)
    }

    unsafe fn resize(
        &mut self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if self.exhausted.get() {
            return None;
        }

        if self.never_move {
            return (new_size <= self.capacity_of(ptr, old_size)).then_some(ptr);
        }

        if !self.always_move {
            return self.inner.resize(ptr, old_size, new_size);
        }

        // Keep the old block alive until the copy is done so the new one
        // always lands at a different address.
        let moved = self.inner.allocate(new_size.max(1))?;
        std::ptr::copy_nonoverlapping(ptr.as_ptr(), moved.as_ptr(), old_size.min(new_size));
        self.inner.release(ptr, old_size);

        if new_size == 0 {
            self.inner.release(moved, 1);
            return Some(NonNull::dangling());
        }
        Some(moved)
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>, size: usize) {
        let contents = std::slice::from_raw_parts(ptr.as_ptr(), size).to_vec();
        self.released.borrow_mut().push(contents);
        self.live_blocks.set(self.live_blocks.get() - 1);

        if self.never_move {
            let capacity = self.capacity_of(ptr, size);
            self.capacities.remove(&(ptr.as_ptr() as usize));
            self.inner.release(ptr, capacity);
        } else {
            self.inner.release(ptr, size);
        }
    }
}
