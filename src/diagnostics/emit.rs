//! Diagnostic emission backend.
//!
//! Handles outputting diagnostics to stderr, logs, or custom sinks.

use std::sync::{Arc, Mutex, MutexGuard};

use super::kind::{Diagnostic, DiagnosticKind};
use super::strict::StrictMode;

/// A diagnostic sink trait for custom output.
pub trait DiagnosticSink {
    /// Handle a diagnostic.
    fn emit(&self, diag: &Diagnostic);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Arc<T> {
    fn emit(&self, diag: &Diagnostic) {
        (**self).emit(diag);
    }
}

/// A simple sink that collects diagnostics.
#[derive(Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get all collected diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Codes of all collected diagnostics, in emission order.
    pub fn codes(&self) -> Vec<&'static str> {
        self.lock().iter().map(|d| d.code).collect()
    }

    /// Clear collected diagnostics.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Check if any errors were collected.
    pub fn has_errors(&self) -> bool {
        self.lock().iter().any(|d| d.kind == DiagnosticKind::Error)
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diag: &Diagnostic) {
        self.lock().push(diag.clone());
    }
}

/// Per-hierarchy diagnostic routing.
///
/// A custom sink takes precedence over the default output. Strict mode is
/// applied after the diagnostic has been delivered.
pub(crate) struct Reporter {
    sink: Option<Box<dyn DiagnosticSink>>,
    strict: StrictMode,
    enabled: bool,
}

impl Reporter {
    pub fn new(strict: StrictMode, enabled: bool) -> Self {
        Self {
            sink: None,
            strict,
            enabled,
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.sink = Some(sink);
    }

    pub fn report(&self, diag: &Diagnostic, context: &str) {
        match &self.sink {
            Some(sink) => sink.emit(diag),
            None if self.enabled => emit_with_context(diag, context),
            None => {}
        }

        if self.strict.should_panic(diag.kind) {
            panic!(
                "[hieralloc][{}] {}\nContext: {}\nStrict mode enabled - {}s are fatal.",
                diag.code,
                diag.message,
                context,
                diag.kind.prefix()
            );
        }
    }
}

/// Emit a diagnostic with runtime context to the default output.
///
/// With the `log` feature the diagnostic goes to the `log` facade. Otherwise
/// it is written to stderr in debug builds, or in release builds with the
/// `diagnostics` feature.
pub fn emit_with_context(diag: &Diagnostic, context: &str) {
    #[cfg(feature = "log")]
    {
        emit_to_log(diag, context);
    }

    #[cfg(all(not(feature = "log"), any(debug_assertions, feature = "diagnostics")))]
    {
        emit_to_stderr(diag, context);
    }

    #[cfg(all(not(feature = "log"), not(any(debug_assertions, feature = "diagnostics"))))]
    {
        let _ = (diag, context);
    }
}

#[cfg(all(not(feature = "log"), any(debug_assertions, feature = "diagnostics")))]
fn emit_to_stderr(diag: &Diagnostic, context: &str) {
    use std::io::Write;

    let mut stderr = std::io::stderr().lock();

    // Main diagnostic line
    let _ = writeln!(
        stderr,
        "[hieralloc][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );

    if !context.is_empty() {
        let _ = writeln!(stderr, "  context: {}", context);
    }
    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }
    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }

    let _ = writeln!(stderr);
}

#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic, context: &str) {
    match diag.kind {
        DiagnosticKind::Error => {
            log::error!("[{}] {} ({})", diag.code, diag.message, context);
        }
        DiagnosticKind::Warning => {
            log::warn!("[{}] {} ({})", diag.code, diag.message, context);
        }
        DiagnosticKind::Note => {
            log::info!("[{}] {} ({})", diag.code, diag.message, context);
        }
    }

    if let Some(note) = diag.note {
        log::info!("  note: {}", note);
    }
    if let Some(help) = diag.help {
        log::info!("  help: {}", help);
    }
}
