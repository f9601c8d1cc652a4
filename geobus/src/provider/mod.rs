//! Geolocation provider abstraction
//!
//! This module defines the plugin contract for position sources and ships
//! the file-backed reference implementation. A provider produces a live
//! stream of [`Fix`] values for a subject key until its cancellation token
//! fires; new positioning technologies are added by implementing
//! [`Provider`] and listing an instance when constructing the orchestrator.
//!
//! # Example
//!
//! ```ignore
//! use geobus::provider::{FileProvider, Provider};
//! use tokio_util::sync::CancellationToken;
//!
//! let provider = FileProvider::new();
//! let shutdown = CancellationToken::new();
//! let mut stream = provider.lookup_stream(shutdown.clone(), "desktop");
//!
//! while let Some(fix) = stream.recv().await {
//!     println!("{} -> {}", provider.name(), fix);
//! }
//! ```

mod file;

pub use file::{
    FileProvider, FileProviderConfig, ReadError, DEFAULT_CONFIDENCE, DEFAULT_GEOLOCATION_PATH,
    DEFAULT_POLL_PERIOD, DEFAULT_TTL,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::fix::Fix;

/// Pluggable source of geolocation observations.
///
/// Implementations own their polling state exclusively; nothing they hold
/// is visible to the orchestrator beyond the fixes they emit.
pub trait Provider: Send + Sync {
    /// Stable identifier used for diagnostics and recorded as the
    /// [`Fix::source`] of every emission.
    ///
    /// Must be unique within one orchestrator's provider set.
    fn name(&self) -> &str;

    /// Opens a live stream of fixes for `key`.
    ///
    /// The stream is unbounded in length and terminates only when
    /// `shutdown` fires or the receiver is dropped. Each call is a fresh
    /// session with no memory of earlier calls' timers or change-detection
    /// state.
    ///
    /// Implementations must emit only on a genuine value change or on the
    /// first successful read, retry transient read failures on their own
    /// schedule instead of failing the stream, and observe cancellation
    /// within one polling interval.
    fn lookup_stream(&self, shutdown: CancellationToken, key: &str) -> mpsc::Receiver<Fix>;
}
