//! Layout utilities.

use std::alloc::Layout;
use std::mem;

/// Alignment of every payload block handed out by [`SystemAlloc`].
///
/// [`SystemAlloc`]: crate::SystemAlloc
pub const PAYLOAD_ALIGN: usize = mem::align_of::<usize>();

/// Layout for a payload block of `size` bytes.
///
/// Returns `None` if the size overflows `isize` once rounded up.
#[inline]
pub fn payload_layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(size, PAYLOAD_ALIGN).ok()
}
