//! SliceBridge Settings Crate
//!
//! Handles application configuration: broker and HTTP endpoints, the preset
//! bundle location and logging preferences.

pub mod config;
pub mod error;

pub use config::{Config, HttpApiSettings, LoggingSettings, MqttSettings, PresetSettings};
pub use error::{SettingsError, SettingsResult};
