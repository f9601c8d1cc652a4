//! Geolocation observation value type.
//!
//! A [`Fix`] is one immutable position observation: where a subject was, how
//! much the source trusts the reading, and for how long the reading may be
//! relied upon. Updates are modeled as new fixes; nothing mutates a fix in
//! place, so fixes can be cloned freely across tasks and compared by value.

use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

/// Minimum latitude in decimal degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum latitude in decimal degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum longitude in decimal degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum longitude in decimal degrees.
pub const MAX_LON: f64 = 180.0;

/// A single geolocation observation for a subject key.
///
/// Fixes are produced by providers, fused by the orchestrator, and fanned out
/// by the bus. Equality is plain value equality over every field; the
/// orchestrator relies on it to suppress duplicate publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Subject the observation pertains to (opaque to the core).
    pub key: String,

    /// Latitude in decimal degrees.
    pub lat: f64,

    /// Longitude in decimal degrees.
    pub lon: f64,

    /// Radius of uncertainty in meters; `0.0` means unknown/unspecified.
    pub accuracy_meters: f64,

    /// Fusion weight in `[0.0, 1.0]`; higher wins ties.
    pub confidence: f64,

    /// Name of the provider that produced the observation.
    pub source: String,

    /// When the observation was produced.
    pub at: Instant,

    /// How long after `at` the observation stays valid.
    pub ttl: Duration,
}

impl Fix {
    /// Instant at which this fix stops being valid.
    pub fn expires_at(&self) -> Instant {
        self.at + self.ttl
    }

    /// Whether the fix is valid at `now`.
    ///
    /// The validity window is half-open: valid during `[at, at + ttl)`,
    /// expired from `at + ttl` onward.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now >= self.at && now < self.expires_at()
    }

    /// Whether the fix has expired as of `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }

    /// Time elapsed since the observation was produced.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.at)
    }

    /// Check the structural invariants of the observation.
    ///
    /// Providers are expected to emit well-formed fixes; the orchestrator
    /// still validates at ingest and discards failures rather than letting a
    /// malformed value participate in fusion. This is a range/shape check
    /// only; geographic plausibility is a consumer concern.
    pub fn validate(&self) -> Result<(), FixError> {
        if !self.lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&self.lat) {
            return Err(FixError::InvalidLatitude(self.lat));
        }
        if !self.lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&self.lon) {
            return Err(FixError::InvalidLongitude(self.lon));
        }
        if !self.accuracy_meters.is_finite() || self.accuracy_meters < 0.0 {
            return Err(FixError::InvalidAccuracy(self.accuracy_meters));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(FixError::InvalidConfidence(self.confidence));
        }
        if self.ttl.is_zero() {
            return Err(FixError::ZeroTtl);
        }
        Ok(())
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}) ±{:.0}m conf {:.2} via {}",
            self.lat, self.lon, self.accuracy_meters, self.confidence, self.source
        )
    }
}

/// Validation failure for a [`Fix`].
#[derive(Debug, Clone, PartialEq)]
pub enum FixError {
    /// Latitude outside `[-90, 90]` or not finite.
    InvalidLatitude(f64),
    /// Longitude outside `[-180, 180]` or not finite.
    InvalidLongitude(f64),
    /// Negative or non-finite accuracy.
    InvalidAccuracy(f64),
    /// Confidence outside `[0, 1]` or not finite.
    InvalidConfidence(f64),
    /// Zero TTL; every fix needs a positive validity window.
    ZeroTtl,
}

impl fmt::Display for FixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixError::InvalidLatitude(lat) => write!(f, "invalid latitude: {}", lat),
            FixError::InvalidLongitude(lon) => write!(f, "invalid longitude: {}", lon),
            FixError::InvalidAccuracy(acc) => write!(f, "invalid accuracy: {}", acc),
            FixError::InvalidConfidence(conf) => write!(f, "invalid confidence: {}", conf),
            FixError::ZeroTtl => write!(f, "ttl must be positive"),
        }
    }
}

impl Error for FixError {}
