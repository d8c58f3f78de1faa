use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use sattrack_common::{BaseMap, CameraIntent, CameraMode, ZoomLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid feed URL '{url}': {reason}")]
    InvalidFeedUrl { url: String, reason: String },

    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("Default zoom {0} is outside 1..=18")]
    ZoomOutOfRange(u8),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,

    #[serde(default)]
    pub default_base_map: BaseMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the marker icon SVGs
    #[serde(default = "default_icon_directory")]
    pub icon_directory: String,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub view: ViewConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

fn default_feed_url() -> String {
    "https://api.wheretheiss.at/v1/satellites/25544".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1100
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("sattrack/{}", env!("CARGO_PKG_VERSION"))
}

fn default_zoom() -> u8 {
    ZoomLevel::DEFAULT.get()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3040
}

fn default_icon_directory() -> String {
    "assets/icons".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_zoom: default_zoom(),
            default_base_map: BaseMap::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            icon_directory: default_icon_directory(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            feed: FeedConfig::default(),
            view: ViewConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn parsed_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidFeedUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::InvalidFeedUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", scheme),
            }),
        }
    }
}

impl ViewConfig {
    /// Camera intent a new session starts with.
    pub fn initial_intent(&self) -> CameraIntent {
        CameraIntent {
            mode: CameraMode::Following,
            zoom: ZoomLevel::clamped(self.default_zoom),
        }
    }
}

impl ServerConfig {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TrackerConfig {
    pub fn parse(content: &str, path: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Startup checks; any failure here is fatal before the poll loop starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.feed.parsed_url()?;

        if self.feed.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        if ZoomLevel::new(self.view.default_zoom).is_none() {
            return Err(ConfigError::ZoomOutOfRange(self.view.default_zoom));
        }

        Ok(())
    }
}

/// Load `path`, falling back to defaults when the file does not exist.
pub fn read_config(path: &str) -> Result<TrackerConfig, ConfigError> {
    if !Path::new(path).exists() {
        // Logging is not up yet.
        eprintln!("Config file {} not found, using defaults", path);
        let config = TrackerConfig::default();
        config.validate()?;
        return Ok(config);
    }

    TrackerConfig::from_file(path)
}
