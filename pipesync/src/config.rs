//! Session manager configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::health::HealthThresholds;
use crate::transport::BackoffConfig;

/// Settings shared by every session of a [`SessionManager`](crate::session::SessionManager).
///
/// Durations are expressed in seconds.
///
/// ```json
/// {
///   "ws_url": "wss://api.example.com/progress",
///   "heartbeat_stale_seconds": 120,
///   "backoff": { "max_delay_ms": 30000 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// WebSocket endpoint of the progress backend.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: f64,
    /// Heartbeat silence before a scope is stale.
    #[serde(default = "default_heartbeat_stale")]
    pub heartbeat_stale_seconds: f64,
    /// Event silence before a refresh is requested.
    #[serde(default = "default_refresh_after")]
    pub refresh_after_seconds: f64,
    /// Event silence before a reconnect is forced.
    #[serde(default = "default_reconnect_after")]
    pub reconnect_after_seconds: f64,
    /// Interval between health checks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: f64,
    /// Delay between joining a pipeline-run room and the first refresh.
    #[serde(default = "default_initial_refresh_delay")]
    pub initial_refresh_delay_seconds: f64,
    /// Reconnect delays.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:8000/ws".to_string()
}

fn default_connect_timeout() -> f64 {
    10.0
}

fn default_heartbeat_stale() -> f64 {
    120.0
}

fn default_refresh_after() -> f64 {
    180.0
}

fn default_reconnect_after() -> f64 {
    300.0
}

fn default_tick_interval() -> f64 {
    30.0
}

fn default_initial_refresh_delay() -> f64 {
    0.5
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            connect_timeout_seconds: default_connect_timeout(),
            heartbeat_stale_seconds: default_heartbeat_stale(),
            refresh_after_seconds: default_refresh_after(),
            reconnect_after_seconds: default_reconnect_after(),
            tick_interval_seconds: default_tick_interval(),
            initial_refresh_delay_seconds: default_initial_refresh_delay(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Converts seconds to a duration; negative or non-finite values become zero.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::ZERO)
}

impl SyncConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the WebSocket endpoint.
    #[must_use]
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Sets the three silence thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, stale: f64, refresh: f64, reconnect: f64) -> Self {
        self.heartbeat_stale_seconds = stale;
        self.refresh_after_seconds = refresh;
        self.reconnect_after_seconds = reconnect;
        self
    }

    /// Sets the health check interval.
    #[must_use]
    pub fn with_tick_interval(mut self, seconds: f64) -> Self {
        self.tick_interval_seconds = seconds;
        self
    }

    /// Sets the initial refresh delay.
    #[must_use]
    pub fn with_initial_refresh_delay(mut self, seconds: f64) -> Self {
        self.initial_refresh_delay_seconds = seconds;
        self
    }

    /// Sets the reconnect backoff.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the health thresholds.
    #[must_use]
    pub fn thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            heartbeat_stale: seconds(self.heartbeat_stale_seconds),
            refresh_after: seconds(self.refresh_after_seconds),
            reconnect_after: seconds(self.reconnect_after_seconds),
        }
    }

    /// Gets the connect timeout as Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        seconds(self.connect_timeout_seconds)
    }

    /// Gets the tick interval as Duration. Never zero.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        seconds(self.tick_interval_seconds).max(Duration::from_millis(1))
    }

    /// Gets the initial refresh delay as Duration.
    #[must_use]
    pub fn initial_refresh_delay(&self) -> Duration {
        seconds(self.initial_refresh_delay_seconds)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.thresholds(), HealthThresholds::default());
        assert_eq!(config.tick_interval(), Duration::from_secs(30));
        assert_eq!(config.initial_refresh_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SyncConfig::from_json(
            r#"{"ws_url": "wss://example.test/ws", "refresh_after_seconds": 60, "backoff": {"max_delay_ms": 1000}}"#,
        )
        .unwrap();

        assert_eq!(config.ws_url, "wss://example.test/ws");
        assert_eq!(config.thresholds().refresh_after, Duration::from_secs(60));
        assert_eq!(config.thresholds().heartbeat_stale, Duration::from_secs(120));
        assert_eq!(config.backoff.max_delay_ms, 1_000);
        assert_eq!(config.backoff.first_delay_ms, 2_000);
    }

    #[test]
    fn test_invalid_durations_clamp() {
        let config = SyncConfig::default()
            .with_tick_interval(0.0)
            .with_initial_refresh_delay(-3.0);

        assert_eq!(config.tick_interval(), Duration::from_millis(1));
        assert_eq!(config.initial_refresh_delay(), Duration::ZERO);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tick_interval_seconds": 5}}"#).unwrap();

        let config = SyncConfig::load(file.path()).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SyncConfig::load("/nonexistent/pipesync.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
