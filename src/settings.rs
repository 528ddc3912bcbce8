//! Live client settings
//!
//! Loaded from YAML, then `.env` and the process environment are applied
//! on top:
//!
//! - `LIVE_WS_URL` replaces `ws_url`
//! - `LIVE_AUTH_TOKEN` supplies the bearer token (never read from YAML)

use livesockets::{builder::states::HasUrl, RealtimeClientBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const WS_URL_ENV: &str = "LIVE_WS_URL";
pub const AUTH_TOKEN_ENV: &str = "LIVE_AUTH_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    pub ws_url: String,

    /// Event the dashboard hooks follow
    pub event_id: Option<String>,

    /// User whose notification feed is followed
    pub user_id: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub reconnect: ReconnectSettings,

    #[serde(default)]
    pub heartbeat: HeartbeatSettings,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default)]
    pub require_handshake: bool,

    /// Size of the recent-items windows kept by hooks
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// Seconds to wait after the client gives up before retrying from scratch;
    /// `null` leaves it in `Error`
    #[serde(default = "default_retry_after_give_up_secs")]
    pub retry_after_give_up_secs: Option<u64>,

    /// Bearer token from the environment (not in YAML)
    #[serde(skip)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectSettings {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Consecutive failures before giving up; `null` retries forever
    pub max_attempts: Option<usize>,
    pub jitter: f64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: Some(10),
            jitter: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            timeout_secs: 10,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_recent_window() -> usize {
    livesockets::hooks::DEFAULT_WINDOW
}

fn default_retry_after_give_up_secs() -> Option<u64> {
    Some(60)
}

fn default_true() -> bool {
    true
}

impl LiveConfig {
    /// Load configuration from YAML file and the environment
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: LiveConfig = serde_yaml::from_str(&yaml_content)?;

        // Load .env file
        dotenv::dotenv().ok(); // Don't fail if .env doesn't exist

        config.apply_env_overrides(
            std::env::var(WS_URL_ENV).ok(),
            std::env::var(AUTH_TOKEN_ENV).ok(),
        );
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self, ws_url: Option<String>, auth_token: Option<String>) {
        if let Some(url) = ws_url.filter(|url| !url.trim().is_empty()) {
            self.ws_url = url;
        }
        self.auth_token = auth_token.filter(|token| !token.trim().is_empty());
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(format!(
                "ws_url must start with ws:// or wss://, got '{}'",
                self.ws_url
            )));
        }

        let reconnect = &self.reconnect;
        if reconnect.base_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect.base_delay_ms must be greater than 0".to_string(),
            ));
        }
        if reconnect.max_delay_ms < reconnect.base_delay_ms {
            return Err(ConfigError::ValidationError(
                "reconnect.max_delay_ms must be >= base_delay_ms".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&reconnect.jitter) {
            return Err(ConfigError::ValidationError(
                "reconnect.jitter must be between 0 and 1".to_string(),
            ));
        }

        if self.heartbeat.enabled
            && (self.heartbeat.interval_secs == 0 || self.heartbeat.timeout_secs == 0)
        {
            return Err(ConfigError::ValidationError(
                "heartbeat interval_secs and timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.retry_after_give_up_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "retry_after_give_up_secs must be greater than 0 (or null)".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Delay before a manual `reconnect()` once the client has given up
    pub fn give_up_retry(&self) -> Option<Duration> {
        self.retry_after_give_up_secs.map(Duration::from_secs)
    }

    /// Client builder carrying these settings
    pub fn client_builder(&self) -> RealtimeClientBuilder<HasUrl> {
        let reconnect = &self.reconnect;
        let mut builder = livesockets::builder()
            .url(self.ws_url.clone())
            .backoff(
                Duration::from_millis(reconnect.base_delay_ms),
                Duration::from_millis(reconnect.max_delay_ms),
                reconnect.max_attempts,
                reconnect.jitter,
            )
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .require_handshake(self.require_handshake);

        builder = if self.heartbeat.enabled {
            builder.heartbeat(
                Duration::from_secs(self.heartbeat.interval_secs),
                Duration::from_secs(self.heartbeat.timeout_secs),
            )
        } else {
            builder.no_heartbeat()
        };

        match &self.auth_token {
            Some(token) => builder.bearer_token(token.clone()),
            None => builder,
        }
    }
}
