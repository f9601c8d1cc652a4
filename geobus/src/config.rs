//! Configuration file handling for ~/.config/geobus/config.ini.
//!
//! [`AppConfig`] collects the daemon's tunables with sensible defaults; the
//! loader overlays values found in an INI file. A missing file yields the
//! defaults, a malformed one is a [`ConfigError`].
//!
//! ```ini
//! [tracking]
//! key = desktop
//! buffer_size = 32
//!
//! [geolocation]
//! file = /etc/geolocation
//! poll_period = 10
//! ttl = 120
//!
//! [log]
//! directory = ~/.local/state/geobus
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::provider::{
    FileProviderConfig, DEFAULT_GEOLOCATION_PATH, DEFAULT_POLL_PERIOD, DEFAULT_TTL,
};

/// Default subject key tracked by the daemon.
pub const DEFAULT_KEY: &str = "desktop";

/// Default subscriber buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 32;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the config file.
    #[error("failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// A present value failed validation.
    #[error("invalid configuration: {section}.{key} = {value:?} - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Tunables of the fusion daemon.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Subject key to track and subscribe to.
    pub key: String,

    /// Buffer size of the daemon's own subscription.
    pub buffer_size: usize,

    /// Path of the geolocation file to poll.
    pub geolocation_path: PathBuf,

    /// File provider polling period.
    pub poll_period: Duration,

    /// TTL stamped on file provider fixes.
    pub ttl: Duration,

    /// Directory for the log file; stdout only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            geolocation_path: PathBuf::from(DEFAULT_GEOLOCATION_PATH),
            poll_period: DEFAULT_POLL_PERIOD,
            ttl: DEFAULT_TTL,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tracked subject key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets the subscription buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the geolocation file path.
    pub fn with_geolocation_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.geolocation_path = path.into();
        self
    }

    /// Sets the file provider polling period.
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Sets the TTL for file provider fixes.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the log directory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// File provider configuration derived from this one.
    pub fn provider_config(&self) -> FileProviderConfig {
        FileProviderConfig::new()
            .with_path(&self.geolocation_path)
            .with_poll_period(self.poll_period)
            .with_ttl(self.ttl)
    }
}

/// Path of the config directory (~/.config/geobus).
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geobus")
}

/// Path of the config file (~/.config/geobus/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Overlays INI values onto the defaults.
fn parse_ini(ini: &Ini) -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::default();

    if let Some(section) = ini.section(Some("tracking")) {
        if let Some(v) = section.get("key") {
            let v = v.trim();
            if !v.is_empty() {
                config.key = v.to_string();
            }
        }
        if let Some(v) = section.get("buffer_size") {
            config.buffer_size = parse_positive(v, "tracking", "buffer_size")?;
        }
    }

    if let Some(section) = ini.section(Some("geolocation")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.geolocation_path = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("poll_period") {
            let secs = parse_positive(v, "geolocation", "poll_period")?;
            config.poll_period = Duration::from_secs(secs as u64);
        }
        if let Some(v) = section.get("ttl") {
            let secs = parse_positive(v, "geolocation", "ttl")?;
            config.ttl = Duration::from_secs(secs as u64);
        }
    }

    if let Some(section) = ini.section(Some("log")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.log_dir = Some(expand_tilde(v));
            }
        }
    }

    Ok(config)
}

fn parse_positive(value: &str, section: &str, key: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a positive integer".to_string(),
        }),
    }
}

fn expand_tilde(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.key, "desktop");
        assert_eq!(config.buffer_size, 32);
        assert_eq!(config.geolocation_path, PathBuf::from("/etc/geolocation"));
        assert_eq!(config.poll_period, Duration::from_secs(10));
        assert_eq!(config.ttl, Duration::from_secs(120));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let config = AppConfig::new()
            .with_key("laptop")
            .with_buffer_size(8)
            .with_geolocation_path("/tmp/geo")
            .with_poll_period(Duration::from_secs(2))
            .with_ttl(Duration::from_secs(30))
            .with_log_dir("/tmp/logs");

        assert_eq!(config.key, "laptop");
        assert_eq!(config.buffer_size, 8);
        assert_eq!(config.geolocation_path, PathBuf::from("/tmp/geo"));
        assert_eq!(config.poll_period, Duration::from_secs(2));
        assert_eq!(config.ttl, Duration::from_secs(30));
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn load_nonexistent_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.ini");

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_full_file() {
        let (_dir, path) = write_config(
            "[tracking]\n\
             key = laptop\n\
             buffer_size = 16\n\
             \n\
             [geolocation]\n\
             file = /var/lib/geo\n\
             poll_period = 5\n\
             ttl = 60\n\
             \n\
             [log]\n\
             directory = /var/log/geobus\n",
        );

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.key, "laptop");
        assert_eq!(config.buffer_size, 16);
        assert_eq!(config.geolocation_path, PathBuf::from("/var/lib/geo"));
        assert_eq!(config.poll_period, Duration::from_secs(5));
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/geobus")));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let (_dir, path) = write_config("[geolocation]\npoll_period = 3\n");

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.poll_period, Duration::from_secs(3));
        assert_eq!(config.key, "desktop");
        assert_eq!(config.ttl, Duration::from_secs(120));
    }

    #[test]
    fn empty_values_are_ignored() {
        let (_dir, path) = write_config("[geolocation]\nfile =\n[tracking]\nkey =  \n");

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.geolocation_path, PathBuf::from("/etc/geolocation"));
        assert_eq!(config.key, "desktop");
    }

    #[test]
    fn non_numeric_period_is_invalid() {
        let (_dir, path) = write_config("[geolocation]\npoll_period = soon\n");

        let err = AppConfig::load_from(&path).unwrap_err();
        match err {
            ConfigError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "geolocation");
                assert_eq!(key, "poll_period");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn zero_ttl_is_invalid() {
        let (_dir, path) = write_config("[geolocation]\nttl = 0\n");

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn zero_buffer_size_is_invalid() {
        let (_dir, path) = write_config("[tracking]\nbuffer_size = 0\n");

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn tilde_paths_expand_to_home() {
        let expanded = expand_tilde("~/geo");
        assert!(expanded.ends_with("geo"));
        assert!(!expanded.to_string_lossy().contains('~'));

        let absolute = expand_tilde("/etc/geolocation");
        assert_eq!(absolute, PathBuf::from("/etc/geolocation"));
    }

    #[test]
    fn provider_config_mirrors_geolocation_settings() {
        let config = AppConfig::new()
            .with_geolocation_path("/tmp/geo")
            .with_poll_period(Duration::from_secs(2))
            .with_ttl(Duration::from_secs(30));

        let provider = config.provider_config();
        assert_eq!(provider.path, PathBuf::from("/tmp/geo"));
        assert_eq!(provider.poll_period, Duration::from_secs(2));
        assert_eq!(provider.ttl, Duration::from_secs(30));
        assert_eq!(provider.confidence, 1.0);
    }
}
