//! Structured JSON logging.
//!
//! Events go to stdout and, when the log directory is writable, to
//! `combined.log` (everything passing the filter) and `error.log` (errors only).

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::Config;

pub const COMBINED_LOG: &str = "combined.log";
pub const ERROR_LOG: &str = "error.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `LOG_LEVEL`. The returned guards flush the file
/// writers on drop and must be held for the lifetime of the process.
pub fn init(config: &Config) -> Vec<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let log_dir = Path::new(&config.log_dir);
    let mut guards = Vec::new();

    let (combined_layer, error_layer) = match prepare_log_dir(log_dir) {
        Ok(()) => {
            let (combined, combined_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, COMBINED_LOG));
            let (errors, errors_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, ERROR_LOG));
            guards.push(combined_guard);
            guards.push(errors_guard);

            (
                Some(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_ansi(false)
                        .with_writer(combined),
                ),
                Some(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_ansi(false)
                        .with_writer(errors)
                        .with_filter(LevelFilter::ERROR),
                ),
            )
        }
        Err(e) => {
            // The subscriber is not installed yet, so this can only go to stderr.
            eprintln!(
                "warning: cannot write logs to {}: {}; falling back to console logging",
                log_dir.display(),
                e
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .with(combined_layer)
        .with(error_layer)
        .init();

    guards
}

/// Create the log directory and make sure both log files can be opened.
fn prepare_log_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;

    for name in [COMBINED_LOG, ERROR_LOG] {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(name))?;
    }

    Ok(())
}
