//! Remoting client configuration with validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default interval between expiry sweeps of the pending call registry
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5);

/// Default capacity of the in-memory reply channel
pub const DEFAULT_REPLY_BUFFER: usize = 1024;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid buffer size: {0}")]
    InvalidBuffer(String),
    #[error("invalid service name: {0}")]
    InvalidServiceName(String),
}

/// Remoting client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemotingConfig {
    /// Name of this client, used in logs
    pub service_name: String,
    /// Deadline applied to calls that do not set their own.
    /// `None` waits until the reply arrives or the call is cancelled.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Option<Duration>,
    /// How often the registry is swept for calls past their deadline
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
    /// Capacity of in-memory reply channels
    pub reply_buffer: usize,
    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON
    pub json_logs: bool,
}

impl Default for RemotingConfig {
    fn default() -> Self {
        Self {
            service_name: "remoting-client".to_string(),
            default_timeout: None,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            reply_buffer: DEFAULT_REPLY_BUFFER,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl RemotingConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `REMOTING_SERVICE_NAME`: Client name (default: remoting-client)
    /// - `REMOTING_DEFAULT_TIMEOUT_MS`: Default call timeout (default: none)
    /// - `REMOTING_CLEANUP_INTERVAL_MS`: Expiry sweep interval (default: 5000)
    /// - `REMOTING_REPLY_BUFFER`: Reply channel capacity (default: 1024)
    /// - `REMOTING_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `REMOTING_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            service_name: env::var("REMOTING_SERVICE_NAME").unwrap_or(defaults.service_name),

            default_timeout: env::var("REMOTING_DEFAULT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),

            cleanup_interval: env::var("REMOTING_CLEANUP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.cleanup_interval),

            reply_buffer: env::var("REMOTING_REPLY_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reply_buffer),

            log_level: env::var("REMOTING_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            json_logs: env::var("REMOTING_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.json_logs),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::InvalidServiceName(
                "service_name cannot be empty".into(),
            ));
        }

        if self.default_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidTimeout(
                "default_timeout cannot be 0".into(),
            ));
        }

        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "cleanup_interval cannot be 0".into(),
            ));
        }

        if self.reply_buffer == 0 {
            return Err(ConfigError::InvalidBuffer("reply_buffer cannot be 0".into()));
        }

        Ok(())
    }

    /// Same configuration with a default call timeout
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }
}
