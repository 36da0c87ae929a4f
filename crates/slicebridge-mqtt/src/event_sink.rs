//! Slicing event sink publishing to MQTT.
//!
//! | Topic | Payload | Retained |
//! |---|---|---|
//! | `{prefix}status` | percent, message, flags, warning_step, is_helio | no |
//! | `{prefix}slicing_completed` | `{"timestamp": n}` | no |
//! | `{prefix}finished` | status, error_message, critical_error, invalidate_plater, error_object_ids | yes |
//! | `{prefix}export/began` | `{"phase": "began"}` | no |
//! | `{prefix}export/finished` | `{"phase": "finished", "path": ...}` | no |

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use slicebridge_core::{ExportInfo, SlicingCompletedInfo, SlicingEventSink, SlicingStatus};

use crate::error::MqttResult;
use crate::link::{LinkOptions, MqttLink};
use crate::publisher::DEFAULT_TOPIC_PREFIX;
use crate::transport::{QoS, TransportRef};

/// Connection and publish settings of the event sink.
#[derive(Debug, Clone)]
pub struct EventSinkConfig {
    pub link: LinkOptions,
    pub topic_prefix: String,
    pub qos: QoS,
}

impl Default for EventSinkConfig {
    fn default() -> Self {
        Self {
            link: LinkOptions::new("localhost", 1883, "slicebridge-events"),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            qos: QoS::AtLeastOnce,
        }
    }
}

impl EventSinkConfig {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            link: LinkOptions::new(host, port, client_id),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.link = self.link.with_credentials(username, password);
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.link = self.link.with_keepalive(keepalive);
        self
    }

    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }
}

/// Publishes slicing lifecycle events.
///
/// Events arriving while the broker is unreachable are dropped.
pub struct MqttEventSink {
    config: EventSinkConfig,
    transport: Mutex<Option<TransportRef>>,
}

impl MqttEventSink {
    pub fn new(config: EventSinkConfig) -> Self {
        Self {
            config,
            transport: Mutex::new(None),
        }
    }

    /// Sink publishing through an existing transport.
    pub fn with_transport(config: EventSinkConfig, transport: TransportRef) -> Self {
        Self {
            config,
            transport: Mutex::new(Some(transport)),
        }
    }

    /// Start the broker client. A second call is a no-op.
    pub fn connect(&self) -> MqttResult<()> {
        let mut transport = self.transport.lock();
        if transport.is_none() {
            let link = MqttLink::connect(&self.config.link)?;
            *transport = Some(Arc::new(link));
        }
        Ok(())
    }

    pub fn disconnect(&self) {
        let transport = self.transport.lock().take();
        if let Some(transport) = transport {
            transport.disconnect();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport
            .lock()
            .as_ref()
            .map(|t| t.is_connected())
            .unwrap_or(false)
    }

    fn publish(&self, topic: &str, payload: &impl Serialize, retained: bool) {
        let transport = match self.transport.lock().clone() {
            Some(transport) if transport.is_connected() => transport,
            _ => return,
        };

        let payload = match serde_json::to_vec(payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Could not encode {} event: {}", topic, e);
                return;
            }
        };

        let full_topic = format!("{}{}", self.config.topic_prefix, topic);
        if let Err(e) = transport.publish(&full_topic, &payload, self.config.qos, retained) {
            tracing::debug!("MQTT event publish to {} failed: {}", full_topic, e);
        }
    }
}

impl SlicingEventSink for MqttEventSink {
    fn on_slicing_update(&self, status: &SlicingStatus) {
        self.publish("status", status, false);
    }

    fn on_slicing_completed(&self, timestamp: i32) {
        self.publish("slicing_completed", &json!({ "timestamp": timestamp }), false);
    }

    fn on_process_finished(&self, info: &SlicingCompletedInfo) {
        let payload = json!({
            "status": info.status.as_str(),
            "error_message": info.error_message.as_deref().unwrap_or(""),
            "critical_error": info.critical_error,
            "invalidate_plater": info.invalidate_plater,
            "error_object_ids": info.error_object_ids,
        });
        self.publish("finished", &payload, true);
    }

    fn on_export_began(&self) {
        self.publish("export/began", &ExportInfo::began(), false);
    }

    fn on_export_finished(&self, path: &str) {
        self.publish("export/finished", &ExportInfo::finished(path), false);
    }
}

impl Drop for MqttEventSink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    fn sink() -> (MqttEventSink, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let sink = MqttEventSink::with_transport(EventSinkConfig::default(), transport.clone());
        (sink, transport)
    }

    #[test]
    fn test_status_payload() {
        let (sink, transport) = sink();
        sink.on_slicing_update(&SlicingStatus::new(42, "slicing").with_flags(2));

        let message = &transport.messages()[0];
        assert_eq!(message.topic, "slicer/status");
        assert!(!message.retained);
        let payload = message.json().unwrap();
        assert_eq!(payload["percent"], 42);
        assert_eq!(payload["message"], "slicing");
        assert_eq!(payload["flags"], 2);
        assert_eq!(payload["is_helio"], false);
    }

    #[test]
    fn test_finished_is_retained() {
        let (sink, transport) = sink();
        let mut info = SlicingCompletedInfo::error("empty plate");
        info.error_object_ids = vec![3, 7];
        sink.on_process_finished(&info);

        let retained = transport.retained("slicer/finished").unwrap();
        let payload: serde_json::Value = serde_json::from_str(&retained).unwrap();
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_message"], "empty plate");
        assert_eq!(payload["error_object_ids"], json!([3, 7]));
    }

    #[test]
    fn test_success_has_empty_error_message() {
        let (sink, transport) = sink();
        sink.on_process_finished(&SlicingCompletedInfo::finished());
        let payload = transport.messages()[0].json().unwrap();
        assert_eq!(payload["status"], "finished");
        assert_eq!(payload["error_message"], "");
    }

    #[test]
    fn test_export_and_completion_topics() {
        let (sink, transport) = sink();
        sink.on_slicing_completed(1700);
        sink.on_export_began();
        sink.on_export_finished("/tmp/out.gcode");

        assert_eq!(
            transport.topics(),
            vec![
                "slicer/slicing_completed",
                "slicer/export/began",
                "slicer/export/finished"
            ]
        );
        assert_eq!(
            transport.messages()[2].payload,
            r#"{"phase":"finished","path":"/tmp/out.gcode"}"#
        );
        assert_eq!(transport.retained_count(), 0);
    }

    #[test]
    fn test_disconnected_drops_events() {
        let (sink, transport) = sink();
        transport.set_connected(false);
        sink.on_export_began();
        assert!(transport.is_empty());
    }
}
