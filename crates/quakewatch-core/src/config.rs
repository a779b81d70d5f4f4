//! Configuration loading and typed config structures for QuakeWatch.
//!
//! The canonical configuration lives in `quakewatch-config.yaml` next to
//! the binary's working directory. This module defines strongly-typed
//! structs that mirror the YAML structure and a loader that reads the file,
//! fills in defaults for anything omitted, and applies environment
//! variable overrides.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Default upstream feed: every earthquake reported in the past hour.
pub const DEFAULT_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_hour.geojson";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {message}")]
    InvalidEnv {
        /// The environment variable name.
        name: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// A setting parsed but is out of range.
    #[error("invalid setting {field}: {message}")]
    Invalid {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level QuakeWatch configuration.
///
/// Mirrors the structure of `quakewatch-config.yaml`. Every field has a
/// default, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuakeWatchConfig {
    /// Upstream feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Background poller settings.
    #[serde(default)]
    pub poller: PollerConfig,

    /// Proximity alert settings.
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// HTTP and `WebSocket` server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl QuakeWatchConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `QUAKEWATCH_FEED_URL` overrides `feed.url`
    /// - `QUAKEWATCH_POLL_INTERVAL` overrides `poller.interval_secs`
    /// - `QUAKEWATCH_ALERT_RADIUS_KM` overrides `alerts.radius_km`
    /// - `QUAKEWATCH_PORT` overrides `observer.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML,
    /// [`ConfigError::InvalidEnv`] if an override is malformed, or
    /// [`ConfigError::Invalid`] if a setting is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML,
    /// [`ConfigError::InvalidEnv`] if an override is malformed, or
    /// [`ConfigError::Invalid`] if a setting is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, used when no file exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if an override is malformed, or
    /// [`ConfigError::Invalid`] if an override is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that parse but cannot run.
    ///
    /// Intervals and the fetch timeout must be non-zero, and the alert
    /// radius must be a finite, non-negative number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("feed.timeout_secs", self.feed.timeout_secs),
            ("poller.interval_secs", self.poller.interval_secs),
            ("observer.push_interval_ms", self.observer.push_interval_ms),
        ];
        if let Some((field, _)) = non_zero.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid {
                field,
                message: String::from("must be greater than zero"),
            });
        }

        let radius = self.alerts.radius_km;
        if !radius.is_finite() || radius < 0.0 {
            return Err(ConfigError::Invalid {
                field: "alerts.radius_km",
                message: format!("must be a non-negative number, got {radius}"),
            });
        }
        Ok(())
    }

    /// Override fields with process environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a variable cannot be parsed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override fields using an arbitrary variable lookup.
    ///
    /// Split out from [`apply_env_overrides`](Self::apply_env_overrides)
    /// so overrides can be tested without touching the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a variable cannot be parsed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("QUAKEWATCH_FEED_URL") {
            self.feed.url = url;
        }
        if let Some(raw) = lookup("QUAKEWATCH_POLL_INTERVAL") {
            self.poller.interval_secs = parse_env("QUAKEWATCH_POLL_INTERVAL", &raw)?;
        }
        if let Some(raw) = lookup("QUAKEWATCH_ALERT_RADIUS_KM") {
            let radius: f64 = parse_env("QUAKEWATCH_ALERT_RADIUS_KM", &raw)?;
            if !radius.is_finite() || radius < 0.0 {
                return Err(ConfigError::InvalidEnv {
                    name: "QUAKEWATCH_ALERT_RADIUS_KM",
                    message: format!("radius must be a non-negative number, got {raw}"),
                });
            }
            self.alerts.radius_km = radius;
        }
        if let Some(raw) = lookup("QUAKEWATCH_PORT") {
            self.observer.port = parse_env("QUAKEWATCH_PORT", &raw)?;
        }
        Ok(())
    }
}

/// Parse a single environment override into `T`.
fn parse_env<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        name,
        message: e.to_string(),
    })
}

/// Upstream feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// GeoJSON feature collection URL.
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Hard bound on a single fetch, in seconds.
    #[serde(default = "default_feed_timeout_secs")]
    pub timeout_secs: u64,
}

impl FeedConfig {
    /// The fetch timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            timeout_secs: default_feed_timeout_secs(),
        }
    }
}

/// Poller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollerConfig {
    /// Seconds to sleep between poll cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

impl PollerConfig {
    /// The poll interval as a [`Duration`].
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Proximity alert configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertsConfig {
    /// Radius applied to `/data` location queries that omit `radius`.
    #[serde(default = "default_alert_radius_km")]
    pub radius_km: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            radius_km: default_alert_radius_km(),
        }
    }
}

/// HTTP and `WebSocket` server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_observer_port")]
    pub port: u16,

    /// Milliseconds between snapshot pushes to each subscriber.
    #[serde(default = "default_push_interval_ms")]
    pub push_interval_ms: u64,
}

impl ObserverConfig {
    /// The push interval as a [`Duration`].
    pub const fn push_interval(&self) -> Duration {
        Duration::from_millis(self.push_interval_ms)
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
            push_interval_ms: default_push_interval_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_owned()
}

const fn default_feed_timeout_secs() -> u64 {
    10
}

const fn default_poll_interval_secs() -> u64 {
    60
}

const fn default_alert_radius_km() -> f64 {
    300.0
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8000
}

const fn default_push_interval_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_owned()
}
