//! Hierarchy configuration.

use crate::diagnostics::StrictMode;
use crate::util::size::{mb, parse_bytes};

/// Environment variable read by [`HierConfig::from_env`] for the memory limit.
pub const MEMORY_LIMIT_ENV: &str = "HIERALLOC_MEMORY_LIMIT";

/// Configuration for a [`Hierarchy`](crate::Hierarchy).
#[derive(Debug, Clone)]
pub struct HierConfig {
    /// Node slots to reserve up front (default: 64)
    pub initial_capacity: usize,

    /// Limit on live payload bytes (0 = unlimited)
    pub memory_limit: usize,

    /// Poison payloads before release (default: on with the `debug` feature)
    pub debug_mode: bool,

    /// How diagnostics escalate
    ///
    /// Anything other than [`StrictMode::Warn`] panics instead of returning
    /// the error. `PanicOnError` covers invalid handles and cycles;
    /// `PanicOnWarning` also covers allocation failures and memory limit
    /// refusals. Leave it at `Warn` wherever every failure must come back
    /// as a [`HierError`](crate::HierError).
    pub strict_mode: StrictMode,

    /// Write diagnostics to stderr / `log` when no sink is installed
    pub emit_diagnostics: bool,
}

impl Default for HierConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            memory_limit: 0,
            debug_mode: cfg!(feature = "debug"),
            strict_mode: StrictMode::Warn,
            emit_diagnostics: cfg!(any(debug_assertions, feature = "diagnostics")),
        }
    }
}

impl HierConfig {
    /// Create a minimal config for testing: no reservation, no output.
    pub fn minimal() -> Self {
        Self {
            initial_capacity: 0,
            memory_limit: 0,
            debug_mode: false,
            strict_mode: StrictMode::Warn,
            emit_diagnostics: false,
        }
    }

    /// Create a config for memory-constrained environments.
    pub fn constrained(limit: usize) -> Self {
        Self {
            memory_limit: limit,
            ..Self::default()
        }
    }

    /// Create a config for CI runs: poisoning on, errors are fatal.
    pub fn strict() -> Self {
        Self {
            debug_mode: true,
            strict_mode: StrictMode::PanicOnError,
            ..Self::default()
        }
    }

    /// Build a config from the defaults plus environment overrides.
    ///
    /// Reads `HIERALLOC_MEMORY_LIMIT` (e.g. `64M`) and `HIERALLOC_STRICT`.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default().with_strict_mode(StrictMode::from_env());

        if let Some(limit) = std::env::var(MEMORY_LIMIT_ENV)
            .ok()
            .and_then(|val| parse_bytes(&val))
        {
            config.memory_limit = limit;
        }

        config
    }

    /// Builder pattern: set initial slot capacity.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Builder pattern: set memory limit in bytes.
    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = limit;
        self
    }

    /// Builder pattern: set memory limit in megabytes.
    pub fn with_memory_limit_mb(self, megabytes: usize) -> Self {
        self.with_memory_limit(mb(megabytes))
    }

    /// Builder pattern: enable debug mode.
    pub fn with_debug(mut self, enable: bool) -> Self {
        self.debug_mode = enable;
        self
    }

    /// Builder pattern: set strict mode.
    pub fn with_strict_mode(mut self, mode: StrictMode) -> Self {
        self.strict_mode = mode;
        self
    }

    /// Builder pattern: enable default diagnostic output.
    pub fn with_diagnostics(mut self, enable: bool) -> Self {
        self.emit_diagnostics = enable;
        self
    }
}
