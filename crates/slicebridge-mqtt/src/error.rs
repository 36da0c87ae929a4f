//! Error types for the MQTT crate.

use thiserror::Error;

/// Errors raised while connecting or publishing.
#[derive(Error, Debug)]
pub enum MqttError {
    /// Publish attempted without a broker connection
    #[error("Not connected to MQTT broker")]
    NotConnected,

    /// The client rejected a request (queue full or closed)
    #[error("MQTT client error: {0}")]
    Client(String),

    /// The connection could not be set up
    #[error("MQTT connection failed: {0}")]
    ConnectionFailed(String),

    /// The routing table data is malformed
    #[error("Invalid topic routing table: {reason}")]
    InvalidRoutes { reason: String },

    /// Invalid QoS level
    #[error("Invalid QoS level {0} (expected 0, 1 or 2)")]
    InvalidQos(u8),

    /// Core layer error (schema loading)
    #[error(transparent)]
    Core(#[from] slicebridge_core::Error),

    /// I/O error (network loop thread)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for MQTT operations.
pub type MqttResult<T> = Result<T, MqttError>;
