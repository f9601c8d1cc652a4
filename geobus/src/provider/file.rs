//! File-backed geolocation provider.
//!
//! Polls a plain-text file of four newline-separated numeric lines
//! (latitude, longitude, altitude, horizontal accuracy in meters) on a
//! fixed period and emits a [`Fix`] whenever any of the four values
//! differs from the previously emitted set, or on the first successful
//! read. Read and parse failures are retried on the next cycle and never
//! terminate the stream.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::fix::{Fix, FixError};
use crate::provider::Provider;

// =============================================================================
// Configuration
// =============================================================================

/// Default path polled for geolocation data.
pub const DEFAULT_GEOLOCATION_PATH: &str = "/etc/geolocation";

/// Default period between file reads; doubles as the retry backoff.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(10);

/// Confidence stamped on fixes read from the file.
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Validity window stamped on fixes read from the file.
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// Configuration for the file provider.
#[derive(Clone, Debug)]
pub struct FileProviderConfig {
    /// Path of the geolocation file to poll.
    pub path: PathBuf,

    /// Period between reads, and the wait after a failed read.
    pub poll_period: Duration,

    /// Confidence stamped on every emitted fix.
    pub confidence: f64,

    /// TTL stamped on every emitted fix.
    pub ttl: Duration,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_GEOLOCATION_PATH),
            poll_period: DEFAULT_POLL_PERIOD,
            confidence: DEFAULT_CONFIDENCE,
            ttl: DEFAULT_TTL,
        }
    }
}

impl FileProviderConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the file path to poll.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the polling period.
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Sets the confidence stamped on emitted fixes.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Sets the TTL stamped on emitted fixes.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

// =============================================================================
// Read errors
// =============================================================================

/// Errors from one read cycle of the geolocation file.
///
/// These never surface through the stream; the session logs them and
/// retries after one polling period.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The file could not be opened or read.
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A non-blank line did not parse as a number.
    #[error("invalid number {value:?} on line {line}")]
    Parse { line: usize, value: String },

    /// Fewer than four numeric values were present.
    #[error("geolocation file has {found} values, need 4")]
    Format { found: usize },
}

// =============================================================================
// File parsing
// =============================================================================

/// One parsed snapshot of the file's four values.
///
/// Altitude participates in change detection but is not carried on the
/// emitted fix.
#[derive(Clone, Debug, PartialEq)]
struct Reading {
    lat: f64,
    lon: f64,
    alt: f64,
    accuracy: f64,
}

fn parse_reading(contents: &str) -> Result<Reading, ReadError> {
    let mut values = Vec::with_capacity(4);
    for (idx, line) in contents.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let value: f64 = line.parse().map_err(|_| ReadError::Parse {
            line: idx + 1,
            value: line.to_string(),
        })?;
        values.push(value);
    }
    if values.len() < 4 {
        return Err(ReadError::Format {
            found: values.len(),
        });
    }
    Ok(Reading {
        lat: values[0],
        lon: values[1],
        alt: values[2],
        accuracy: values[3],
    })
}

async fn read_reading(path: &Path) -> Result<Reading, ReadError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_reading(&contents)
}

// =============================================================================
// File provider
// =============================================================================

/// Provider that polls a local file for geolocation data.
pub struct FileProvider {
    name: String,
    config: FileProviderConfig,
}

impl FileProvider {
    /// Creates a provider polling [`DEFAULT_GEOLOCATION_PATH`].
    pub fn new() -> Self {
        Self::with_config(FileProviderConfig::default())
    }

    /// Creates a provider with explicit configuration.
    pub fn with_config(config: FileProviderConfig) -> Self {
        Self {
            name: "GeolocationFile".to_string(),
            config,
        }
    }
}

impl Default for FileProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for FileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup_stream(&self, shutdown: CancellationToken, key: &str) -> mpsc::Receiver<Fix> {
        let (tx, rx) = mpsc::channel(1);
        let session = PollSession {
            key: key.to_string(),
            source: self.name.clone(),
            config: self.config.clone(),
        };
        tokio::spawn(session.run(shutdown, tx));
        rx
    }
}

// =============================================================================
// Polling session
// =============================================================================

/// One polling session for a single key.
///
/// State is per-session; a later `lookup_stream` call starts from scratch.
struct PollSession {
    key: String,
    source: String,
    config: FileProviderConfig,
}

impl PollSession {
    async fn run(self, shutdown: CancellationToken, tx: mpsc::Sender<Fix>) {
        debug!(
            key = %self.key,
            path = %self.config.path.display(),
            "file provider session starting"
        );

        // Values behind the last emitted fix. Discarded readings (read
        // failures, out-of-range values) leave it untouched, so recovery
        // to the pre-outage values stays silent.
        let mut last: Option<Reading> = None;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match read_reading(&self.config.path).await {
                Ok(reading) => {
                    if last.as_ref() != Some(&reading) {
                        match self.build_fix(&reading) {
                            Ok(fix) => {
                                tokio::select! {
                                    biased;

                                    _ = shutdown.cancelled() => break,

                                    sent = tx.send(fix) => {
                                        if sent.is_err() {
                                            // Receiver gone, session over.
                                            break;
                                        }
                                        last = Some(reading);
                                    }
                                }
                            }
                            Err(err) => {
                                warn!(
                                    key = %self.key,
                                    error = %err,
                                    "discarding out-of-range reading"
                                );
                            }
                        }
                    }
                }
                Err(err) => {
                    debug!(
                        key = %self.key,
                        error = %err,
                        "geolocation read failed, retrying next cycle"
                    );
                }
            }

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = tokio::time::sleep(self.config.poll_period) => {}
            }
        }

        debug!(key = %self.key, "file provider session stopped");
    }

    fn build_fix(&self, reading: &Reading) -> Result<Fix, FixError> {
        let fix = Fix {
            key: self.key.clone(),
            lat: reading.lat,
            lon: reading.lon,
            accuracy_meters: reading.accuracy,
            confidence: self.config.confidence,
            source: self.source.clone(),
            at: Instant::now(),
            ttl: self.config.ttl,
        };
        fix.validate()?;
        Ok(fix)
    }
}

// =============================================================================
// Tests
// =============================================================================
