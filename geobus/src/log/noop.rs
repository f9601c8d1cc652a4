//! Logger that discards everything.

use std::fmt::Arguments;

use super::{LogLevel, Logger};

/// Silent [`Logger`] for tests and embedders without diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLogger;

impl NoOpLogger {
    /// Create a new no-op logger.
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NoOpLogger {
    fn log(&self, _level: LogLevel, _args: Arguments<'_>) {}
}
