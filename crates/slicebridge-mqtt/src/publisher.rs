//! MQTT config publisher.
//!
//! Listens on the config change bus and republishes every change as a
//! retained envelope on the key's routed topic. Also publishes whole preset
//! snapshots on demand (printer and filament), and the preset change events
//! raised by the HTTP façade.
//!
//! All publishes use QoS 1 and are retained, so a late subscriber sees the
//! last value of every topic. While disconnected every publish is a no-op.

use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use slicebridge_core::{
    config_bus, ConfigChangeBus, ConfigChangeListener, OptionValue, PrintConfig, SchemaRegistry,
    StaticSchemaRegistry,
};

use crate::envelope;
use crate::error::MqttResult;
use crate::link::{LinkOptions, MqttLink};
use crate::routing::TopicRouter;
use crate::transport::{QoS, TransportRef};

/// Default topic prefix.
pub const DEFAULT_TOPIC_PREFIX: &str = "slicer/";

/// Vector option whose length gives the printer's extruder count.
const EXTRUDER_COUNT_KEY: &str = "nozzle_diameter";

/// Publishes config values and preset snapshots to MQTT.
///
/// Always held in an `Arc`; the publisher keeps a weak handle to itself so
/// it can register as a bus listener without the bus owning it.
pub struct MqttConfigPublisher {
    router: TopicRouter,
    schema: Arc<dyn SchemaRegistry>,
    options: Mutex<LinkOptions>,
    topic_prefix: RwLock<String>,
    transport: Mutex<Option<TransportRef>>,
    self_ref: Weak<MqttConfigPublisher>,
}

impl MqttConfigPublisher {
    /// Create a publisher over the given routing table and schema.
    pub fn create(router: TopicRouter, schema: Arc<dyn SchemaRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            router,
            schema,
            options: Mutex::new(LinkOptions::new("localhost", 1883, "slicebridge-config")),
            topic_prefix: RwLock::new(DEFAULT_TOPIC_PREFIX.to_string()),
            transport: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    /// Create a publisher over the bundled routing table and schema.
    pub fn create_default() -> MqttResult<Arc<Self>> {
        let router = TopicRouter::builtin()?;
        let schema = StaticSchemaRegistry::builtin()?;
        Ok(Self::create(router, Arc::new(schema)))
    }

    /// Set broker parameters used by the next [`connect`](Self::connect).
    pub fn configure(&self, host: &str, port: u16, client_id: &str) {
        let mut options = self.options.lock();
        options.host = host.to_string();
        options.port = port;
        options.client_id = client_id.to_string();
    }

    pub fn set_credentials(&self, username: Option<String>, password: Option<String>) {
        let mut options = self.options.lock();
        options.username = username;
        options.password = password;
    }

    pub fn set_keepalive(&self, keepalive: Duration) {
        self.options.lock().keepalive = keepalive;
    }

    pub fn set_topic_prefix(&self, prefix: impl Into<String>) {
        *self.topic_prefix.write() = prefix.into();
    }

    pub fn topic_prefix(&self) -> String {
        self.topic_prefix.read().clone()
    }

    pub fn router(&self) -> &TopicRouter {
        &self.router
    }

    /// Start the broker connection.
    ///
    /// Returns as soon as the client's network loop is running; the
    /// handshake completes in the background. Returns `true` immediately
    /// when a client already exists.
    pub fn connect(&self) -> bool {
        if self.transport.lock().is_some() {
            return true;
        }

        let options = self.options.lock().clone();
        match MqttLink::connect(&options) {
            Ok(link) => {
                tracing::info!(
                    "MQTT config publisher started for {}:{} as '{}'",
                    options.host,
                    options.port,
                    options.client_id
                );
                self.attach_transport(Arc::new(link));
                true
            }
            Err(e) => {
                tracing::warn!("MQTT config publisher could not connect: {}", e);
                false
            }
        }
    }

    /// Use `transport` instead of a broker client. Any previous transport is
    /// disconnected.
    pub fn attach_transport(&self, transport: TransportRef) {
        let previous = self.transport.lock().replace(transport);
        if let Some(previous) = previous {
            previous.disconnect();
        }
    }

    /// Wait up to `timeout` for the broker handshake.
    pub fn wait_for_connection(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_connected() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    /// Register as a weak listener on `bus`.
    pub fn register_with(&self, bus: &ConfigChangeBus) {
        let listener: Weak<dyn ConfigChangeListener> = self.self_ref.clone();
        bus.add_listener(listener);
    }

    /// Register as a weak listener on the process-wide config bus.
    pub fn register_with_dispatcher(&self) {
        self.register_with(config_bus());
    }

    /// Stop the client and drop it.
    pub fn disconnect(&self) {
        let transport = self.transport.lock().take();
        if let Some(transport) = transport {
            transport.disconnect();
            tracing::info!("MQTT config publisher disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport
            .lock()
            .as_ref()
            .map(|t| t.is_connected())
            .unwrap_or(false)
    }

    /// Publish `payload` on `topic_prefix + topic` with QoS 1.
    ///
    /// Returns whether the publish was enqueued; `false` when disconnected.
    pub fn publish(&self, topic: &str, payload: &str, retained: bool) -> bool {
        let transport = match self.transport.lock().clone() {
            Some(transport) if transport.is_connected() => transport,
            _ => return false,
        };

        let full_topic = format!("{}{}", self.topic_prefix.read(), topic);
        match transport.publish(&full_topic, payload.as_bytes(), QoS::AtLeastOnce, retained) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("MQTT publish to {} failed: {}", full_topic, e);
                false
            }
        }
    }

    /// Publish one changed value on its routed topic.
    pub fn publish_change(&self, opt_key: &str, value: &OptionValue) -> bool {
        if !self.is_connected() {
            return false;
        }
        let topic = self.router.get_topic(opt_key);
        let payload = envelope::encode(opt_key, value, self.schema.get(opt_key));
        self.publish(&topic, &payload, true)
    }

    /// Publish every routed key present in `config`.
    ///
    /// Only scalar options are published. Returns the number of publishes.
    pub fn publish_full_config(&self, config: &PrintConfig) -> usize {
        if !self.is_connected() {
            return 0;
        }

        let mut published = 0;
        for key in self.router.keys() {
            let Some(option) = config.option(key) else {
                continue;
            };
            match option.to_scalar_value() {
                Some(value) => {
                    if self.publish_change(key, &value) {
                        published += 1;
                    }
                }
                None => tracing::trace!("Skipping {} option '{}'", option.kind(), key),
            }
        }
        published
    }

    /// Publish a printer preset snapshot.
    ///
    /// Extruder-indexed vector options are split into one publish per
    /// extruder; the extruder count is the length of `nozzle_diameter`
    /// (one when the option is missing, zero when it is empty).
    pub fn publish_printer_config(&self, config: &PrintConfig, preset_name: &str) -> usize {
        if !self.is_connected() {
            return 0;
        }

        let mut published = 0;
        if self.publish(
            "config/printer/preset_name",
            &envelope::preset_name(preset_name, None),
            true,
        ) {
            published += 1;
        }

        let extruders = config
            .option(EXTRUDER_COUNT_KEY)
            .filter(|o| o.is_vector())
            .map(|o| o.len())
            .unwrap_or(1);

        for (key, option) in config.iter() {
            let meta = self.schema.get(key);

            if option.is_vector() && self.router.extruder_group(key).is_some() {
                for idx in 0..extruders {
                    let (Some(value), Some(topic)) =
                        (option.value_at(idx), self.router.extruder_topic(key, idx))
                    else {
                        continue;
                    };
                    if self.publish(&topic, &envelope::encode(key, &value, meta), true) {
                        published += 1;
                    }
                }
            } else if let Some(value) = option.to_value() {
                let topic = self.router.printer_topic(key);
                if self.publish(&topic, &envelope::encode(key, &value, meta), true) {
                    published += 1;
                }
            }
        }

        tracing::debug!(
            "Published printer preset '{}' ({} messages)",
            preset_name,
            published
        );
        published
    }

    /// Publish a filament preset snapshot under `config/filament/{idx}/`.
    pub fn publish_filament_config(
        &self,
        config: &PrintConfig,
        preset_name: &str,
        extruder_idx: usize,
    ) -> usize {
        if !self.is_connected() {
            return 0;
        }

        let prefix = format!("config/filament/{}/", extruder_idx);
        let mut published = 0;
        if self.publish(
            &format!("{}preset_name", prefix),
            &envelope::preset_name(preset_name, Some(extruder_idx)),
            true,
        ) {
            published += 1;
        }

        for (key, option) in config.iter() {
            let Some(value) = option.to_value() else {
                continue;
            };
            let payload = envelope::encode(key, &value, self.schema.get(key));
            if self.publish(&format!("{}{}", prefix, key), &payload, true) {
                published += 1;
            }
        }

        tracing::debug!(
            "Published filament preset '{}' for extruder {} ({} messages)",
            preset_name,
            extruder_idx,
            published
        );
        published
    }

    /// Announce a printer preset switch on `config/presets/printer`.
    pub fn publish_printer_changed(&self, previous: &str, current: &str) -> bool {
        let payload = json!({
            "event": "printer_changed",
            "previous": previous,
            "current": current,
        });
        self.publish("config/presets/printer", &payload.to_string(), true)
    }

    /// Announce a filament preset switch on `config/presets/filament`.
    pub fn publish_filament_changed(&self, extruder: usize, previous: &str, current: &str) -> bool {
        let payload = json!({
            "event": "filament_changed",
            "extruder": extruder,
            "previous": previous,
            "current": current,
        });
        self.publish("config/presets/filament", &payload.to_string(), true)
    }
}

impl ConfigChangeListener for MqttConfigPublisher {
    fn on_config_change(&self, opt_key: &str, value: &OptionValue) {
        self.publish_change(opt_key, value);
    }
}

impl Drop for MqttConfigPublisher {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for MqttConfigPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttConfigPublisher")
            .field("topic_prefix", &self.topic_prefix())
            .field("connected", &self.is_connected())
            .finish()
    }
}
