//! Flat allocation primitive underneath the hierarchy.
//!
//! The hierarchy never talks to the system heap directly. Every payload
//! block goes through a [`RawAlloc`], so embedders can plug in their own
//! arena, a budgeted allocator, or a test double that forces relocation.

use std::alloc::{alloc_zeroed, dealloc, realloc};
use std::ptr::NonNull;

use crate::util::layout::payload_layout;

/// A flat allocate/resize/release primitive.
///
/// # Safety
///
/// Implementors must return pointers to at least `size` readable and
/// writable bytes, zero-filled on `allocate`. `resize` must preserve the
/// first `min(old_size, new_size)` bytes, and on failure must leave the
/// original block valid and untouched. Zero-size blocks may be represented
/// by a dangling pointer, which is then passed back to `resize`/`release`.
pub unsafe trait RawAlloc {
    /// Allocate `size` zero-filled bytes. Returns `None` on exhaustion.
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>>;

    /// Resize a block previously returned by this allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block from this allocator of exactly `old_size`
    /// bytes. On success the old pointer must no longer be used.
    unsafe fn resize(
        &mut self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block from this allocator of exactly `size` bytes.
    unsafe fn release(&mut self, ptr: NonNull<u8>, size: usize);
}

/// [`RawAlloc`] backed by the global Rust allocator.
///
/// Blocks are word aligned. Zero-size requests never touch the heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAlloc;

impl SystemAlloc {
    /// Create a new system allocator handle.
    pub const fn new() -> Self {
        Self
    }

    fn empty() -> NonNull<u8> {
        NonNull::dangling()
    }
}

unsafe impl RawAlloc for SystemAlloc {
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return Some(Self::empty());
        }

        let layout = payload_layout(size)?;
        // SAFETY: layout has non-zero size
        NonNull::new(unsafe { alloc_zeroed(layout) })
    }

    unsafe fn resize(
        &mut self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if old_size == 0 {
            return self.allocate(new_size);
        }

        if new_size == 0 {
            self.release(ptr, old_size);
            return Some(Self::empty());
        }

        let layout = payload_layout(old_size)?;
        // Reject sizes the layout cannot describe before handing them to realloc
        payload_layout(new_size)?;

        NonNull::new(realloc(ptr.as_ptr(), layout, new_size))
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>, size: usize) {
        if size == 0 {
            return;
        }

        if let Some(layout) = payload_layout(size) {
            dealloc(ptr.as_ptr(), layout);
        }
    }
}
