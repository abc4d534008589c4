//! Strict mode handling for diagnostics.
//!
//! Allows configuration of how diagnostics are treated:
//! - Warn: Just emit the diagnostic
//! - Panic: Emit and then panic (useful for CI)

use super::kind::DiagnosticKind;

/// Environment variable consulted by [`StrictMode::from_env`].
pub const STRICT_ENV: &str = "HIERALLOC_STRICT";

/// Strict mode behavior.
///
/// A panicking mode unwinds out of the failing call instead of returning its
/// error. Allocation failures are warnings, so they only unwind under
/// `PanicOnWarning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictMode {
    /// Just warn, don't panic.
    #[default]
    Warn,
    /// Panic on errors.
    PanicOnError,
    /// Panic on errors and warnings.
    PanicOnWarning,
}

impl StrictMode {
    /// Parse a strict mode setting.
    ///
    /// - "0" or "warn" -> Warn
    /// - "1" or "error" -> PanicOnError
    /// - "2" or "warning" -> PanicOnWarning
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "0" | "warn" | "false" => Some(StrictMode::Warn),
            "1" | "error" | "true" => Some(StrictMode::PanicOnError),
            "2" | "warning" | "all" => Some(StrictMode::PanicOnWarning),
            _ => None,
        }
    }

    /// Read the mode from `HIERALLOC_STRICT`, defaulting to `Warn`.
    pub fn from_env() -> Self {
        std::env::var(STRICT_ENV)
            .ok()
            .and_then(|val| Self::parse(&val))
            .unwrap_or_default()
    }

    /// Check if a diagnostic of this kind should abort.
    pub fn should_panic(&self, kind: DiagnosticKind) -> bool {
        match kind {
            DiagnosticKind::Error => {
                matches!(self, StrictMode::PanicOnError | StrictMode::PanicOnWarning)
            }
            DiagnosticKind::Warning => matches!(self, StrictMode::PanicOnWarning),
            DiagnosticKind::Note => false,
        }
    }
}
