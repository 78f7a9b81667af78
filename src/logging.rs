//! Structured logging setup using `tracing-subscriber`.
//!
//! The binary only runs one-shot subcommands, so there is a single mode:
//! human-readable output to stderr, filtered by `RUST_LOG`. Embedding
//! applications install their own subscriber instead of calling this.

use tracing_subscriber::EnvFilter;

/// Initialise logging for CLI subcommands.
///
/// Emits human-readable output to stderr. Controlled by `RUST_LOG`
/// (default: `info`).
pub fn init_cli() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
