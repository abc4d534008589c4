//! Debug utilities for tracking allocations.
//!
//! Poisoning is always available and switched on by
//! [`HierConfig::debug_mode`](crate::HierConfig::debug_mode). Backtrace
//! tracking is only compiled when the `debug` feature is enabled.

#[cfg(feature = "debug")]
pub(crate) mod backtrace;
pub(crate) mod poison;

#[cfg(feature = "debug")]
pub use self::backtrace::AllocationTrace;
pub use self::poison::FREED_PATTERN;
