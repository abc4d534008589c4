//! Hierarchy error types.

use std::fmt;

use crate::allocators::slots::NodeId;

/// Broad classification of a [`HierError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A handle or argument does not describe a usable node.
    InvalidArgument,
    /// The request could not be satisfied with the memory available.
    AllocationFailure,
}

/// Errors returned by [`Hierarchy`](crate::Hierarchy) operations.
///
/// Every error leaves the tree exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierError {
    /// The handle is dangling, was freed, or was invalidated by a relocating resize.
    InvalidHandle(NodeId),
    /// Adopting `node` under `parent` would make `node` its own ancestor.
    WouldCycle {
        /// The node being moved.
        node: NodeId,
        /// The requested new parent.
        parent: NodeId,
    },
    /// The flat allocator could not provide `requested` bytes.
    AllocationFailed {
        /// Number of bytes requested.
        requested: usize,
    },
    /// The request would push live payload bytes over the configured limit.
    MemoryLimitExceeded {
        /// Number of additional bytes requested.
        requested: usize,
        /// Live payload bytes at the time of the request.
        live: usize,
        /// Configured memory limit.
        limit: usize,
    },
}

impl HierError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HierError::InvalidHandle(_) | HierError::WouldCycle { .. } => ErrorKind::InvalidArgument,
            HierError::AllocationFailed { .. } | HierError::MemoryLimitExceeded { .. } => {
                ErrorKind::AllocationFailure
            }
        }
    }
}

impl fmt::Display for HierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierError::InvalidHandle(id) => write!(f, "invalid node handle: {}", id),
            HierError::WouldCycle { node, parent } => {
                write!(f, "adopting {} under {} would create a cycle", node, parent)
            }
            HierError::AllocationFailed { requested } => {
                write!(f, "allocation of {} bytes failed", requested)
            }
            HierError::MemoryLimitExceeded {
                requested,
                live,
                limit,
            } => write!(
                f,
                "memory limit exceeded: requested {} bytes with {} live, limit {}",
                requested, live, limit
            ),
        }
    }
}

impl std::error::Error for HierError {}

/// Result alias for hierarchy operations.
pub type Result<T> = std::result::Result<T, HierError>;
