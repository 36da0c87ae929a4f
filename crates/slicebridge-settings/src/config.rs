//! Configuration for SliceBridge
//!
//! Supports JSON and TOML files. Configuration is organized into sections:
//! - MQTT broker connection and topic layout
//! - HTTP control API binding
//! - Preset bundle location
//! - Logging preferences
//!
//! Every section has defaults, so a file only needs the values it changes.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::error::{SettingsError, SettingsResult};

/// MQTT broker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    /// Publish configuration and slicing events to a broker
    pub enabled: bool,
    pub broker_host: String,
    pub broker_port: u16,
    /// Client id of the configuration publisher
    pub client_id: String,
    /// Client id of the slicing event publisher
    pub event_client_id: String,
    /// Prefix prepended to every topic
    pub topic_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub keepalive_secs: u64,
    /// QoS of slicing event publishes (config publishes always use 1)
    pub qos: u8,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "slicebridge-config".to_string(),
            event_client_id: "slicebridge-events".to_string(),
            topic_prefix: "slicer/".to_string(),
            username: None,
            password: None,
            keepalive_secs: 60,
            qos: 1,
        }
    }
}

/// HTTP control API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpApiSettings {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
    /// Emit permissive CORS headers
    pub enable_cors: bool,
}

impl Default for HttpApiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Preset bundle settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetSettings {
    /// JSON preset bundle loaded at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Logging preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mqtt: MqttSettings,
    pub http: HttpApiSettings,
    pub presets: PresetSettings,
    pub logging: LoggingSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let mqtt = &self.mqtt;
        if mqtt.enabled {
            if mqtt.broker_host.trim().is_empty() {
                return Err(SettingsError::invalid("mqtt.broker_host", "must not be empty"));
            }
            if mqtt.broker_port == 0 {
                return Err(SettingsError::invalid("mqtt.broker_port", "must be > 0"));
            }
            if mqtt.client_id.is_empty() || mqtt.event_client_id.is_empty() {
                return Err(SettingsError::invalid("mqtt.client_id", "must not be empty"));
            }
            if mqtt.client_id == mqtt.event_client_id {
                return Err(SettingsError::invalid(
                    "mqtt.event_client_id",
                    "must differ from mqtt.client_id",
                ));
            }
        }
        if mqtt.qos > 2 {
            return Err(SettingsError::invalid("mqtt.qos", "must be 0, 1 or 2"));
        }
        if mqtt.keepalive_secs < 5 {
            return Err(SettingsError::invalid("mqtt.keepalive_secs", "must be >= 5"));
        }
        if mqtt.topic_prefix.contains(['#', '+']) {
            return Err(SettingsError::invalid(
                "mqtt.topic_prefix",
                "must not contain wildcards",
            ));
        }

        if self.http.enabled {
            if self.http.bind_address.parse::<IpAddr>().is_err() {
                return Err(SettingsError::invalid(
                    "http.bind_address",
                    format!("'{}' is not an IP address", self.http.bind_address),
                ));
            }
            if self.http.port == 0 {
                return Err(SettingsError::invalid("http.port", "must be > 0"));
            }
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(SettingsError::invalid(
                "logging.level",
                format!("expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }

        Ok(())
    }
}
