pub mod policy;

pub use policy::{HeartbeatPolicy, ReconnectPolicy, ReconnectSchedule};

use crate::CHANNEL_SERVER_BASE_URL;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

const CONFIG_FILE_NAME: &str = "channel.json";
const CONFIG_VERSION: u32 = 1;

const DEFAULT_DUPLEX_PATH: &str = "/socket.io";
const DEFAULT_STATUS_PATH: &str = "/api/websocket-status";
const DEFAULT_INTERFACES_PATH: &str = "/api/interfaces";
const DEFAULT_DYNAMIC_PREFIX: &str = "/api/dynamic";
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 30_000;

// ============================================
// CONFIG STRUCT
// ============================================

/// Everything the channel manager needs, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Origin of the service, e.g. `http://127.0.0.1:5000`.
    ///
    /// Scheme, host and port only. Route paths are absolute, so a mount prefix
    /// belongs in `status_path`, `interfaces_path` and `dynamic_prefix`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Explicit WebSocket URL. Derived from `base_url` + `duplex_path` when unset.
    #[serde(default)]
    pub duplex_url: Option<String>,

    #[serde(default = "default_duplex_path")]
    pub duplex_path: String,

    #[serde(default = "default_status_path")]
    pub status_path: String,

    #[serde(default = "default_interfaces_path")]
    pub interfaces_path: String,

    #[serde(default = "default_dynamic_prefix")]
    pub dynamic_prefix: String,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    #[serde(default)]
    pub reconnect: ReconnectPolicy,

    #[serde(default)]
    pub heartbeat: HeartbeatPolicy,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            base_url: default_base_url(),
            duplex_url: None,
            duplex_path: default_duplex_path(),
            status_path: default_status_path(),
            interfaces_path: default_interfaces_path(),
            dynamic_prefix: default_dynamic_prefix(),
            probe_timeout_ms: default_probe_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            reconnect: ReconnectPolicy::default(),
            heartbeat: HeartbeatPolicy::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_base_url() -> String {
    CHANNEL_SERVER_BASE_URL.to_string()
}
fn default_duplex_path() -> String {
    DEFAULT_DUPLEX_PATH.to_string()
}
fn default_status_path() -> String {
    DEFAULT_STATUS_PATH.to_string()
}
fn default_interfaces_path() -> String {
    DEFAULT_INTERFACES_PATH.to_string()
}
fn default_dynamic_prefix() -> String {
    DEFAULT_DYNAMIC_PREFIX.to_string()
}
fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}
fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}
fn default_handshake_timeout_ms() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_MS
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ChannelConfig {
    /// Config pointing at a specific service origin, everything else default.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Load config from {config_dir}/channel.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(ChannelConfig)` if loaded successfully or defaults if file missing.
    /// Returns `Err(ConfigError)` if file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: ChannelConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/channel.json using temp file + rename.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(validation_error(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(validation_error(format!(
                "Invalid base URL format: {}",
                self.base_url
            )));
        }

        // Routes are joined as absolute paths, which would drop any base path
        match Url::parse(&self.base_url) {
            Ok(url) if url.path() == "/" => {}
            Ok(url) => {
                return Err(validation_error(format!(
                    "Base URL must be an origin without a path, got path '{}': {}",
                    url.path(),
                    self.base_url
                )));
            }
            Err(e) => {
                return Err(validation_error(format!(
                    "Invalid base URL {}: {e}",
                    self.base_url
                )));
            }
        }

        if let Some(ref url) = self.duplex_url
            && !url.starts_with("ws://")
            && !url.starts_with("wss://")
        {
            return Err(validation_error(format!(
                "Invalid duplex URL format: {}",
                url
            )));
        }

        for (name, path) in [
            ("duplex_path", &self.duplex_path),
            ("status_path", &self.status_path),
            ("interfaces_path", &self.interfaces_path),
            ("dynamic_prefix", &self.dynamic_prefix),
        ] {
            if !path.starts_with('/') {
                return Err(validation_error(format!(
                    "{name} must start with '/': {path}"
                )));
            }
        }

        if self.probe_timeout_ms == 0 || self.request_timeout_ms == 0 || self.handshake_timeout_ms == 0
        {
            return Err(validation_error("Timeouts must be non-zero".to_string()));
        }

        let reconnect = &self.reconnect;
        if reconnect.base_delay_ms > reconnect.max_delay_ms {
            return Err(validation_error(format!(
                "Reconnect base delay {}ms exceeds max delay {}ms",
                reconnect.base_delay_ms, reconnect.max_delay_ms
            )));
        }

        if !(0.0..=1.0).contains(&reconnect.randomization_factor) {
            return Err(validation_error(format!(
                "Invalid randomization factor: {} (must be 0.0-1.0)",
                reconnect.randomization_factor
            )));
        }

        if self.heartbeat.interval_ms == 0 || self.heartbeat.timeout_ms <= self.heartbeat.interval_ms
        {
            return Err(validation_error(format!(
                "Heartbeat timeout {}ms must exceed non-zero interval {}ms",
                self.heartbeat.timeout_ms, self.heartbeat.interval_ms
            )));
        }

        Ok(())
    }
}

#[track_caller]
fn validation_error(reason: String) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason,
    }
}
