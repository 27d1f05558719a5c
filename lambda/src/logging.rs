//! Default log output for functions.
//!
//! CloudWatch stamps every line on its own and does not render colours, so
//! the subscriber installed here writes neither.

use tracing_subscriber::EnvFilter;

/// Level used when neither `AWS_LAMBDA_LOG_LEVEL` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a `tracing` subscriber writing to stdout.
///
/// The filter comes from `AWS_LAMBDA_LOG_LEVEL` (the advanced logging
/// control of the platform), then `RUST_LOG`, then [`DEFAULT_LOG_FILTER`].
/// Calling this more than once is harmless.
pub fn init_default_subscriber() {
    let filter = EnvFilter::try_from_env("AWS_LAMBDA_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .try_init();

    if installed.is_err() {
        tracing::debug!("a global subscriber was already installed");
    }
}
