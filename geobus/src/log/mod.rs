//! Pluggable diagnostic logging.
//!
//! The bus and orchestrator report drops, discards, and lifecycle events
//! through a [`Logger`] injected at construction instead of a fixed global
//! sink. Production code installs [`TracingLogger`]; tests that do not care
//! about diagnostics pass [`NoOpLogger`].

mod noop;
mod tracing_adapter;

pub use noop::NoOpLogger;
pub use tracing_adapter::TracingLogger;

use std::fmt::Arguments;

/// Severity of a diagnostic message, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Sink for diagnostic messages from the fusion pipeline.
///
/// Implementations must be cheap and non-blocking; the bus logs on the
/// publish path and providers log from their polling loops.
pub trait Logger: Send + Sync {
    /// Record one message at the given level.
    fn log(&self, level: LogLevel, args: Arguments<'_>);

    /// Record a message at trace level.
    fn trace(&self, args: Arguments<'_>) {
        self.log(LogLevel::Trace, args);
    }

    /// Record a message at debug level.
    fn debug(&self, args: Arguments<'_>) {
        self.log(LogLevel::Debug, args);
    }

    /// Record a message at info level.
    fn info(&self, args: Arguments<'_>) {
        self.log(LogLevel::Info, args);
    }

    /// Record a message at warn level.
    fn warn(&self, args: Arguments<'_>) {
        self.log(LogLevel::Warn, args);
    }

    /// Record a message at error level.
    fn error(&self, args: Arguments<'_>) {
        self.log(LogLevel::Error, args);
    }
}

/// Log at trace level through a [`Logger`](crate::log::Logger).
#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)*) => {
        $logger.trace(format_args!($($arg)*))
    };
}

/// Log at debug level through a [`Logger`](crate::log::Logger).
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(format_args!($($arg)*))
    };
}

/// Log at info level through a [`Logger`](crate::log::Logger).
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(format_args!($($arg)*))
    };
}

/// Log at warn level through a [`Logger`](crate::log::Logger).
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(format_args!($($arg)*))
    };
}

/// Log at error level through a [`Logger`](crate::log::Logger).
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.error(format_args!($($arg)*))
    };
}
