//! CLI error types.

use std::fmt;
use std::io;

use geobus::config::ConfigError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration loading, validation, or environment setup failed.
    Config(String),
    /// Logging initialization failed.
    Logging(io::Error),
    /// The async runtime could not be started.
    Runtime(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(message) => write!(f, "configuration error: {}", message),
            CliError::Logging(err) => write!(f, "failed to initialize logging: {}", err),
            CliError::Runtime(err) => write!(f, "failed to start runtime: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(_) => None,
            CliError::Logging(err) | CliError::Runtime(err) => Some(err),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
