//! Adapter forwarding [`Logger`] messages into the `tracing` ecosystem.

use std::fmt::Arguments;

use super::{LogLevel, Logger};

/// [`Logger`] that emits every message through the matching `tracing` macro.
///
/// Messages land in whatever subscriber the host process installed (see
/// [`crate::logging::init_logging`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    /// Create a new tracing-backed logger.
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        match level {
            LogLevel::Trace => tracing::trace!("{}", args),
            LogLevel::Debug => tracing::debug!("{}", args),
            LogLevel::Info => tracing::info!("{}", args),
            LogLevel::Warn => tracing::warn!("{}", args),
            LogLevel::Error => tracing::error!("{}", args),
        }
    }
}
