//! Tracing macros for allocator operations.
//!
//! These compile to nothing unless the `log` feature is enabled.

/// Trace an allocator operation through the `log` facade.
///
/// # Example
///
/// ```rust,ignore
/// ha_trace!("allocate {} bytes under {:?}", size, parent);
/// ```
macro_rules! ha_trace {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        {
            log::trace!(target: "hieralloc", $($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            if false {
                let _ = format!($($arg)+);
            }
        }
    }};
}

/// Log a notable allocator event at debug level.
macro_rules! ha_debug {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        {
            log::debug!(target: "hieralloc", $($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            if false {
                let _ = format!($($arg)+);
            }
        }
    }};
}

pub(crate) use ha_debug;
pub(crate) use ha_trace;
