//! Logging configuration for threshold-monitor.
//!
//! Logs go to stderr so stdout carries only the report.

use tracing_subscriber::EnvFilter;

/// Initializes stderr logging.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` with `verbose`.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose))),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the filter directive used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}
