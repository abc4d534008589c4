//! Build script for hieralloc.
//!
//! Prints build-time notes about enabled features and helpful hints for
//! users integrating hieralloc into their projects.

use std::env;

fn main() {
    // Re-run if features change
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");

    let debug_enabled = env::var("CARGO_FEATURE_DEBUG").is_ok();
    let diagnostics_enabled = env::var("CARGO_FEATURE_DIAGNOSTICS").is_ok();
    let log_enabled = env::var("CARGO_FEATURE_LOG").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    // =========================================================================
    // Feature-specific notes
    // =========================================================================

    if debug_enabled {
        emit_info("Debug features enabled");
        emit_note("Freed payloads are poisoned with 0xCD");
        emit_note("Allocation backtraces are kept for leak reports");

        if is_release {
            emit_warning("Debug features enabled in release build!");
            emit_note("Every allocation captures a backtrace. Consider disabling for production.");
        }
    }

    if log_enabled {
        emit_info("Diagnostics routed through the `log` facade");
        if diagnostics_enabled {
            emit_note("`diagnostics` has no effect while `log` is enabled");
        }
    } else if is_release && !diagnostics_enabled {
        emit_note("Diagnostics are silent in release builds.");
        emit_note("Enable 'diagnostics' or 'log' to keep them:");
        emit_note("  hieralloc = { version = \"0.1\", features = [\"log\"] }");
    }
}

// =============================================================================
// Emission helpers
// =============================================================================

fn emit_info(msg: &str) {
    println!("cargo:warning=[hieralloc] {}", msg);
}

fn emit_note(msg: &str) {
    println!("cargo:warning=[hieralloc]    {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[hieralloc] warning: {}", msg);
}
