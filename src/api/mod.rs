//! Public API for hieralloc.
//!
//! This module contains all user-facing types and functions.
//! Most users should only interact with types from this module.

pub mod config;
pub mod error;
pub mod finalizer;
pub mod hierarchy;
pub mod iter;
pub mod stats;
