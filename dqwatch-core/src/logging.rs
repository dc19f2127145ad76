//! Shared logging utilities for the dqwatch binary and embedding services.
//!
//! Provides consistent logging configuration for anything driving the
//! reporting pipeline.

use tracing_subscriber::EnvFilter;

use crate::Result;

/// Maps CLI verbosity flags onto a tracing level.
fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Filter used when `RUST_LOG` is unset or invalid.
fn fallback_filter(verbose: u8, quiet: bool) -> EnvFilter {
    EnvFilter::new(level_for(verbose, quiet).as_str().to_ascii_lowercase())
}

/// Initializes structured logging based on verbosity level.
///
/// `RUST_LOG` directives take precedence over the verbosity flags.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
///
/// # Example
/// ```rust,no_run
/// use dqwatch_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter(verbose, quiet));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::DqWatchError::configuration(format!("Failed to initialize logging: {e}"))
        })?;

    Ok(())
}
