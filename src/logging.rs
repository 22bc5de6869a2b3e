//! Logging initialization for the logsanitizer binary.
//!
//! `RUST_LOG` wins when set; otherwise the `-v` count picks the level.
//! Logs always go to stderr so they never mix with row output.

use crate::error::SanitizerError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize the global tracing subscriber.
///
/// Must be called once, before any tracing macros are used.
pub fn init_tracing(verbosity: u8) -> Result<(), SanitizerError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| SanitizerError::Logging(e.to_string()))
}
