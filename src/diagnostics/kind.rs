//! Diagnostic kinds and core types.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - something is definitely wrong.
    Error,
    /// A warning - something is probably wrong or suboptimal.
    Warning,
    /// Additional context about another diagnostic.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `HA0xx` - Handle issues
/// - `HA1xx` - Allocation issues
/// - `HA2xx` - Tree structure issues
/// - `HA3xx` - Deferred free issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "HA001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new note diagnostic.
    pub const fn note(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Note,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// Predefined diagnostics (HA0xx - Handles)
// =============================================================================

/// HA001: Operation on a dangling or stale handle.
pub const HA001: Diagnostic = Diagnostic::error(
    "HA001",
    "operation on a dangling or stale node handle"
).with_note("the node was freed, or its payload was relocated by resize()")
 .with_help("use the handle returned by resize(), and do not reuse handles after free()");

// =============================================================================
// Predefined diagnostics (HA1xx - Allocation)
// =============================================================================

/// HA101: Flat allocator exhausted.
pub const HA101: Diagnostic = Diagnostic::warning(
    "HA101",
    "underlying allocator could not satisfy the request"
).with_note("the tree was left unchanged")
 .with_help("free unused subtrees or request less memory");

/// HA102: Configured memory limit reached.
pub const HA102: Diagnostic = Diagnostic::warning(
    "HA102",
    "allocation exceeds the configured memory limit"
).with_note("the tree was left unchanged")
 .with_help("raise memory_limit in HierConfig, or free unused subtrees");

// =============================================================================
// Predefined diagnostics (HA2xx - Tree structure)
// =============================================================================

/// HA201: Adoption would create an ownership cycle.
pub const HA201: Diagnostic = Diagnostic::error(
    "HA201",
    "adopt() would make a node its own ancestor"
).with_note("the new parent is the node itself or one of its descendants")
 .with_help("detach() the new parent first, or adopt in the other direction");

// =============================================================================
// Predefined diagnostics (HA3xx - Deferred frees)
// =============================================================================

/// HA301: Deferred free of a node that is already gone.
pub const HA301: Diagnostic = Diagnostic::note(
    "HA301",
    "deferred free skipped a handle that is no longer live"
).with_note("an ancestor was freed first, or the same node was queued twice");
