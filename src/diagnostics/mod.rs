//! Allocator diagnostics.
//!
//! This module provides:
//! - **Runtime diagnostics**: Allocator-aware messages with codes
//! - **Sinks**: Route diagnostics to tests, overlays or custom loggers
//! - **Strict mode**: Optional panic-on-error for CI
//! - **Tracing**: Operation-level `log` output with the `log` feature
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | HA0xx | Handle issues                  |
//! | HA1xx | Allocation issues              |
//! | HA2xx | Tree structure issues          |
//! | HA3xx | Deferred free issues           |
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use hieralloc::{CollectingSink, Hierarchy, NodeId};
//!
//! let sink = Arc::new(CollectingSink::new());
//! let mut tree = Hierarchy::new();
//! tree.set_diagnostic_sink(sink.clone());
//!
//! assert!(tree.free(NodeId::dangling()).is_err());
//! assert_eq!(sink.codes(), vec!["HA001"]);
//! ```

pub mod emit;
pub mod kind;
pub(crate) mod macros;
pub mod strict;

pub(crate) use emit::Reporter;

pub use emit::{emit_with_context, CollectingSink, DiagnosticSink};
pub use kind::{Diagnostic, DiagnosticKind};
pub use strict::{StrictMode, STRICT_ENV};

pub use kind::{HA001, HA101, HA102, HA201, HA301};
