//! Logging setup.
//!
//! The provider logs through `tracing`. Everything goes to **stderr**: the
//! engine owns stdout. HTTP requests are logged at `debug` with method, path
//! and status only; bodies and the API key never reach the log.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `sonarr_provider=debug`)
//!
//! # Examples
//!
//! ```bash
//! # Show every request sent to Sonarr
//! RUST_LOG=sonarr_provider=debug ./sonarr-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level, used when `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Useful in tests, where several providers may share a process.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}
