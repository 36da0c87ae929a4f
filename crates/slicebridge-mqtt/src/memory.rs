//! In-process transport that records publishes.
//!
//! Keeps the full publish log plus a retained store with broker semantics:
//! a retained publish replaces the topic's previous retained payload.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{MqttError, MqttResult};
use crate::transport::{QoS, Transport};

/// One recorded publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retained: bool,
}

impl PublishedMessage {
    /// Parse the payload as JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.payload).ok()
    }
}

/// Recording transport, connected on creation.
#[derive(Debug)]
pub struct MemoryTransport {
    connected: AtomicBool,
    log: Mutex<Vec<PublishedMessage>>,
    retained: Mutex<BTreeMap<String, String>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            log: Mutex::new(Vec::new()),
            retained: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Every publish in order.
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.log.lock().clone()
    }

    /// Publishes whose topic equals `topic`.
    pub fn messages_on(&self, topic: &str) -> Vec<PublishedMessage> {
        self.log
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Topics in publish order.
    pub fn topics(&self) -> Vec<String> {
        self.log.lock().iter().map(|m| m.topic.clone()).collect()
    }

    /// Current retained payload of `topic`.
    pub fn retained(&self, topic: &str) -> Option<String> {
        self.retained.lock().get(topic).cloned()
    }

    pub fn retained_count(&self) -> usize {
        self.retained.lock().len()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Forget the publish log and the retained store.
    pub fn clear(&self) {
        self.log.lock().clear();
        self.retained.lock().clear();
    }
}

impl Transport for MemoryTransport {
    fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retained: bool) -> MqttResult<()> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected);
        }
        let payload = String::from_utf8_lossy(payload).into_owned();
        if retained {
            let mut store = self.retained.lock();
            // An empty retained payload clears the topic.
            if payload.is_empty() {
                store.remove(topic);
            } else {
                store.insert(topic.to_string(), payload.clone());
            }
        }
        self.log.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            qos,
            retained,
        });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        self.set_connected(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retained_replaces() {
        let transport = MemoryTransport::new();
        transport.publish("t", b"1", QoS::AtLeastOnce, true).unwrap();
        transport.publish("t", b"2", QoS::AtLeastOnce, true).unwrap();
        transport.publish("t", b"3", QoS::AtLeastOnce, false).unwrap();

        assert_eq!(transport.len(), 3);
        assert_eq!(transport.retained_count(), 1);
        assert_eq!(transport.retained("t").as_deref(), Some("2"));
    }

    #[test]
    fn test_disconnected_rejects() {
        let transport = MemoryTransport::new();
        transport.disconnect();
        assert!(matches!(
            transport.publish("t", b"x", QoS::AtMostOnce, false),
            Err(MqttError::NotConnected)
        ));
        assert!(transport.is_empty());
    }
}
