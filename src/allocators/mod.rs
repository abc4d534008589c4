//! Allocation backends.
//!
//! This module contains the flat allocator seam and the node storage.
//! **Together with `api::hierarchy`, these are the only modules that
//! should contain `unsafe` code.**

pub(crate) mod deferred;
pub(crate) mod raw;
pub(crate) mod slots;
