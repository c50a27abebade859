//! Logging utilities for evco-http
//!
//! Re-exports tracing macros with log_* naming convention for consistency,
//! and installs the process subscriber for the current build mode.

// Re-export tracing macros with log_* naming
pub use tracing::{
    debug as log_debug,
    error as log_error,
    info as log_info,
    trace as log_trace,
    warn as log_warn,
};

use crate::config::BuildMode;
use tracing_subscriber::EnvFilter;

/// Default filter directive for a build mode.
///
/// Development builds log verbosely; production keeps only errors.
pub fn default_directive(mode: BuildMode) -> &'static str {
    match mode {
        BuildMode::Development => "debug",
        BuildMode::Production => "error",
    }
}

/// Install a fmt subscriber for `mode`. `RUST_LOG` takes precedence.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(mode: BuildMode) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(mode)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
