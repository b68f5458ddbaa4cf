// crates/manifest-gate-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Installs the process-wide tracing subscriber.
// Purpose: Route library diagnostics to stderr under an env-controlled filter.
// Dependencies: tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! Log events from the core crates go to stderr so stdout stays reserved for
//! command output. The filter is read from [`LOG_ENV`] and defaults to
//! `error`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "MANIFEST_GATE_LOG";

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::ERROR.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
