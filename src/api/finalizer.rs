//! Finalizer callbacks fired when a node is freed.

/// A callback run once when its node is freed.
///
/// The finalizer receives the node's payload while the storage is still
/// live. It runs after every descendant's finalizers and must not rely on
/// any descendant still existing.
///
/// Any `FnOnce(&mut [u8])` closure is a finalizer; implement the trait
/// directly to carry context in a named type.
///
/// ```rust
/// use hieralloc::{Finalizer, Hierarchy};
///
/// struct Zeroize;
///
/// impl Finalizer for Zeroize {
///     fn finalize(self: Box<Self>, payload: &mut [u8]) {
///         payload.fill(0);
///     }
/// }
///
/// let mut tree = Hierarchy::new();
/// let secret = tree.allocate_bytes(None, b"hunter2").unwrap();
/// tree.add_finalizer(secret, Zeroize).unwrap();
/// tree.free(secret).unwrap();
/// ```
pub trait Finalizer {
    /// Consume the finalizer with a view of the node's payload.
    fn finalize(self: Box<Self>, payload: &mut [u8]);
}

impl<F> Finalizer for F
where
    F: FnOnce(&mut [u8]),
{
    fn finalize(self: Box<Self>, payload: &mut [u8]) {
        (*self)(payload)
    }
}
