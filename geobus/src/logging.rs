//! Tracing subscriber setup for the daemon process.
//!
//! Library code only emits through [`crate::log::Logger`] or `tracing`
//! macros; installing a subscriber is the host's job. [`init_logging`] is
//! the standard setup used by the CLI: stdout plus an optional non-blocking
//! file appender, filtered by `RUST_LOG`.

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Name of the log file created inside the log directory.
pub const LOG_FILE_NAME: &str = "geobus.log";

/// Keeps the non-blocking file writer alive.
///
/// Dropping the guard flushes and stops the background writer thread; hold
/// it for the lifetime of the process.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber.
///
/// Filters from `RUST_LOG` (default `info`), writes compact human-readable
/// output to stdout, and additionally appends plain-text records to
/// [`LOG_FILE_NAME`] under `log_dir` when a directory is given.
///
/// Must be called at most once per process; the returned guard must outlive
/// all logging.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created.
pub fn init_logging(log_dir: Option<&Path>) -> io::Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = tracing_subscriber::fmt::layer().compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
