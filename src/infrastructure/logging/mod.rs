//! Logging setup with optional file output for long-running integrations.
//!
//! Library users with their own `tracing` subscriber should skip this and
//! keep theirs; the crate only emits events through the `tracing` macros.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize logging with console output and, when `log_dir` is given, a
/// daily-rolling `coffre-login.log` in that directory.
///
/// `verbose` lowers the default filter from `info` to `debug`; the
/// `RUST_LOG` environment variable overrides either.
pub fn setup(verbose: bool, log_dir: Option<&Path>) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Console layer (always enabled)
    let console_layer = fmt::layer().with_target(true).with_filter(filter);

    let file_layer = match log_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Warning: Failed to create log directory {dir:?}: {e}");
                None
            } else {
                let file_appender =
                    RollingFileAppender::new(Rotation::DAILY, dir, "coffre-login.log");

                Some(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false) // No ANSI colors in file output
                        .with_writer(file_appender)
                        .with_filter(EnvFilter::new("info")),
                )
            }
        }
        None => None,
    };

    match file_layer {
        Some(file_layer) => {
            tracing_subscriber::registry()
                .with(console_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry().with(console_layer).init();
        }
    }

    tracing::info!("Logging initialized (verbose={})", verbose);
}
