//! The publish seam between the publishers and an MQTT client.

use std::sync::Arc;

pub use rumqttc::v5::mqttbytes::QoS;

use crate::error::{MqttError, MqttResult};

/// Outbound side of an MQTT client.
///
/// `publish` enqueues and returns; it never waits for the broker.
pub trait Transport: Send + Sync {
    /// Enqueue a publish of `payload` on the full `topic`.
    fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retained: bool) -> MqttResult<()>;

    /// Current broker connection state.
    fn is_connected(&self) -> bool;

    /// Stop the client. Later publishes fail.
    fn disconnect(&self);
}

/// Shared handle to a transport.
pub type TransportRef = Arc<dyn Transport>;

/// Map a numeric QoS level to the client's enum.
pub fn qos_from_level(level: u8) -> MqttResult<QoS> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(MqttError::InvalidQos(other)),
    }
}
