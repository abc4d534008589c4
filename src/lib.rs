//! # hieralloc
//!
//! Hierarchical ownership allocation with cascading frees.
//!
//! ## Features
//!
//! - Every allocation is a node owned by at most one parent
//! - Freeing a node frees its whole subtree
//! - Finalizers fire deepest-first, before any storage is released
//! - Re-parenting with `adopt` / `detach`, with cycle rejection
//! - Content-preserving `resize`, relocation detected through handles
//! - Generational handles: stale handles are errors, not aliasing bugs
//! - Pluggable flat allocator (`RawAlloc`)
//! - Memory limits, statistics and coded diagnostics
//! - Deferred frees requested from other threads
//!
//! ## Quick Start
//!
//! ```rust
//! use hieralloc::{Hierarchy, HierConfig};
//!
//! let mut tree = Hierarchy::with_config(HierConfig::default());
//!
//! let request = tree.allocate(None, 64).unwrap();
//! let header = tree.allocate_str(Some(request), "content-type").unwrap();
//! tree.add_finalizer(header, |payload: &mut [u8]| payload.fill(0)).unwrap();
//!
//! // ... use the tree ...
//!
//! tree.free(request).unwrap();
//! assert!(tree.is_empty());
//! ```
//!
//! ## Threading
//!
//! A [`Hierarchy`] is single-threaded and performs no locking. Other threads
//! may only queue frees through [`DeferredFreeQueue`].

pub mod api;
pub mod debug;
pub mod diagnostics;

mod allocators;
mod util;

// Re-export public API at crate root for convenience
pub use api::config::{HierConfig, MEMORY_LIMIT_ENV};
pub use api::error::{ErrorKind, HierError, Result};
pub use api::finalizer::Finalizer;
pub use api::hierarchy::{Hierarchy, Resize};
pub use api::iter::{Ancestors, Children};
pub use api::stats::HierStats;

// Handles and the flat allocator seam
pub use allocators::deferred::DeferredFreeQueue;
pub use allocators::raw::{RawAlloc, SystemAlloc};
pub use allocators::slots::NodeId;

// Diagnostics
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticKind, DiagnosticSink, StrictMode};
pub use diagnostics::{HA001, HA101, HA102, HA201, HA301};

// Size helpers
pub use util::size::{format_bytes, kb, mb};
