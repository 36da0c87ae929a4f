//! Application services context.
//!
//! A [`Studio`] owns the preset store slot and the MQTT config publisher.
//! It is created once at startup and handed to the subsystems that need it;
//! the HTTP API reads presets through it and publishes preset changes
//! through its publisher.

use parking_lot::RwLock;
use std::sync::Arc;

use slicebridge_core::SharedPresetStore;
use slicebridge_mqtt::MqttConfigPublisher;

/// Central application services.
#[derive(Default)]
pub struct Studio {
    presets: RwLock<Option<SharedPresetStore>>,
    mqtt_publisher: RwLock<Option<Arc<MqttConfigPublisher>>>,
}

impl Studio {
    /// Create and initialize the services.
    ///
    /// The MQTT publisher is created here but not connected; call
    /// [`init_mqtt`](Self::init_mqtt) once the network is available.
    pub fn create() -> Arc<Self> {
        let studio = Self::default();
        match MqttConfigPublisher::create_default() {
            Ok(publisher) => *studio.mqtt_publisher.write() = Some(publisher),
            Err(e) => tracing::error!("MQTT config publisher unavailable: {}", e),
        }
        tracing::info!("Studio services initialized");
        Arc::new(studio)
    }

    /// Studio using an existing publisher.
    pub fn with_publisher(publisher: Arc<MqttConfigPublisher>) -> Arc<Self> {
        let studio = Self::default();
        *studio.mqtt_publisher.write() = Some(publisher);
        Arc::new(studio)
    }

    pub fn set_preset_store(&self, store: Option<SharedPresetStore>) {
        *self.presets.write() = store;
    }

    pub fn preset_store(&self) -> Option<SharedPresetStore> {
        self.presets.read().clone()
    }

    pub fn mqtt_publisher(&self) -> Option<Arc<MqttConfigPublisher>> {
        self.mqtt_publisher.read().clone()
    }

    /// Configure and connect the MQTT publisher, then register it on the
    /// config change bus.
    pub fn init_mqtt(&self, broker_host: &str, broker_port: u16, client_id: &str) -> bool {
        let Some(publisher) = self.mqtt_publisher() else {
            tracing::error!("MQTT publisher not created");
            return false;
        };

        publisher.configure(broker_host, broker_port, client_id);
        if publisher.connect() {
            publisher.register_with_dispatcher();
            tracing::info!(
                "MQTT config publisher connecting to {}:{}",
                broker_host,
                broker_port
            );
            true
        } else {
            tracing::warn!(
                "MQTT config publisher failed to connect to {}:{}",
                broker_host,
                broker_port
            );
            false
        }
    }

    /// Publish the merged configuration of the selected presets.
    ///
    /// Returns the number of values published.
    pub fn publish_full_config(&self) -> usize {
        let Some(publisher) = self.mqtt_publisher() else {
            tracing::warn!("Cannot publish full config: MQTT publisher not initialized");
            return 0;
        };
        if !publisher.is_connected() {
            tracing::warn!("Cannot publish full config: MQTT not connected");
            return 0;
        }
        let Some(store) = self.preset_store() else {
            tracing::warn!("Cannot publish full config: preset store not set");
            return 0;
        };

        let config = store.lock().full_config();
        let published = publisher.publish_full_config(&config);
        tracing::info!("Published full config to MQTT ({} keys)", config.len());
        published
    }

    /// Release the preset store and disconnect MQTT.
    pub fn shutdown(&self) {
        tracing::info!("Studio shutting down services");
        self.presets.write().take();
        if let Some(publisher) = self.mqtt_publisher.write().take() {
            publisher.disconnect();
        }
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("has_presets", &self.presets.read().is_some())
            .field("mqtt_publisher", &self.mqtt_publisher.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use slicebridge_core::{ConfigOption, Preset, PresetBundle, PrintConfig};
    use slicebridge_mqtt::{MemoryTransport, Transport};

    fn bundle() -> SharedPresetStore {
        let mut bundle = PresetBundle::new();
        bundle.printers.add(Preset::new(
            "P1",
            PrintConfig::new().with("printable_height", ConfigOption::Float(250.0)),
        ));
        bundle.prints.add(Preset::new(
            "Standard",
            PrintConfig::new()
                .with("layer_height", ConfigOption::Float(0.2))
                .with("wall_loops", ConfigOption::Int(2)),
        ));
        Arc::new(Mutex::new(bundle))
    }

    #[test]
    fn test_publish_full_config_requires_connection() {
        let studio = Studio::create();
        studio.set_preset_store(Some(bundle()));
        assert_eq!(studio.publish_full_config(), 0);
    }

    #[test]
    fn test_publish_full_config() {
        let publisher = MqttConfigPublisher::create_default().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        publisher.attach_transport(transport.clone());

        let studio = Studio::with_publisher(publisher);
        assert_eq!(studio.publish_full_config(), 0);

        studio.set_preset_store(Some(bundle()));
        assert_eq!(studio.publish_full_config(), 2);
        assert!(transport
            .retained("slicer/config/quality/layer_height/layer_height")
            .is_some());
    }

    #[test]
    fn test_shutdown_releases_services() {
        let publisher = MqttConfigPublisher::create_default().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        publisher.attach_transport(transport.clone());

        let studio = Studio::with_publisher(publisher);
        studio.set_preset_store(Some(bundle()));
        studio.shutdown();

        assert!(studio.preset_store().is_none());
        assert!(studio.mqtt_publisher().is_none());
        assert!(!transport.is_connected());
    }
}
