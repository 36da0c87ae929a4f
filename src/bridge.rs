//! Application wiring.
//!
//! [`Bridge`] builds every subsystem from a [`Config`]: the event
//! dispatcher, the studio services with the preset bundle, the UI loop,
//! the slicing process, the MQTT publishers and the HTTP API.

use anyhow::Context;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use slicebridge_api::{HttpApiConfig, HttpSlicerApi, Studio, UiHooks};
use slicebridge_core::{
    CompletionStatus, PresetBundle, PresetKind, PresetsView, QueueUiScheduler, SharedPresetStore,
    SlicingEventDispatcher, SlicingEventSinkRef, SlicingProcess, UiEvent, UiEventSink,
};
use slicebridge_core::types::thread_safe;
use slicebridge_mqtt::{qos_from_level, EventSinkConfig, MqttEventSink};
use slicebridge_settings::{Config, HttpApiSettings, MqttSettings};

use crate::simulator::{SimulatedProcess, SimulationOptions};

const MQTT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Preset view without a window: selector refreshes are logged.
struct HeadlessPresetsView;

impl PresetsView for HeadlessPresetsView {
    fn update_presets(&self, kind: PresetKind) {
        tracing::info!("Preset selector refreshed: {}", kind);
    }

    fn mark_project_dirty(&self) {
        tracing::debug!("Project marked dirty");
    }
}

fn log_ui_event(event: UiEvent) {
    match event {
        UiEvent::SlicingUpdate(status) => {
            tracing::debug!("Slicing {}%: {}", status.percent, status.message)
        }
        UiEvent::SlicingCompleted { timestamp } => {
            tracing::info!("Slicing completed (timestamp {})", timestamp)
        }
        UiEvent::ProcessFinished(info) => match info.status {
            CompletionStatus::Error => tracing::error!(
                "Slicing failed: {}",
                info.error_message.as_deref().unwrap_or("unknown error")
            ),
            status => tracing::info!("Slicing process {}", status),
        },
        UiEvent::ExportBegan => tracing::info!("G-code export started"),
        UiEvent::ExportFinished { path } => tracing::info!("G-code exported to {}", path),
    }
}

fn load_presets(config: &Config) -> anyhow::Result<PresetBundle> {
    match &config.presets.file {
        Some(path) => {
            let bundle = PresetBundle::load_from_file(path)
                .with_context(|| format!("loading presets from {}", path.display()))?;
            tracing::info!(
                "Loaded {} printer and {} filament presets from {}",
                bundle.printers.len(),
                bundle.filaments.len(),
                path.display()
            );
            Ok(bundle)
        }
        None => {
            tracing::info!("No preset file configured, starting with an empty bundle");
            Ok(PresetBundle::new())
        }
    }
}

fn event_sink_config(settings: &MqttSettings) -> anyhow::Result<EventSinkConfig> {
    Ok(EventSinkConfig::new(
        settings.broker_host.clone(),
        settings.broker_port,
        settings.event_client_id.clone(),
    )
    .with_credentials(settings.username.clone(), settings.password.clone())
    .with_keepalive(Duration::from_secs(settings.keepalive_secs))
    .with_topic_prefix(settings.topic_prefix.clone())
    .with_qos(qos_from_level(settings.qos)?))
}

fn http_config(settings: &HttpApiSettings) -> HttpApiConfig {
    HttpApiConfig {
        bind_address: settings.bind_address.clone(),
        port: settings.port,
        enable_cors: settings.enable_cors,
    }
}

/// The running application.
pub struct Bridge {
    dispatcher: Arc<SlicingEventDispatcher>,
    studio: Arc<Studio>,
    presets: SharedPresetStore,
    process: Arc<SimulatedProcess>,
    http: Option<HttpSlicerApi>,
    mqtt_events: Option<Arc<MqttEventSink>>,
    ui_scheduler: Option<Arc<QueueUiScheduler>>,
    ui_thread: Mutex<Option<JoinHandle<()>>>,
    stopped: bool,
}

impl Bridge {
    /// Start every enabled subsystem with a default simulated process.
    pub fn start(config: &Config) -> anyhow::Result<Self> {
        Self::start_with(config, SimulationOptions::default())
    }

    pub fn start_with(config: &Config, simulation: SimulationOptions) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;

        let dispatcher = Arc::new(SlicingEventDispatcher::new());
        let studio = Studio::create();
        let presets: SharedPresetStore = thread_safe(load_presets(config)?);
        studio.set_preset_store(Some(presets.clone()));

        let (scheduler, ui_queue) = QueueUiScheduler::new();
        let scheduler = Arc::new(scheduler);
        let ui_thread = ui_queue.spawn().context("spawning UI loop")?;
        dispatcher.add_sink(Arc::new(UiEventSink::new(
            scheduler.clone(),
            Arc::new(log_ui_event),
        )));

        let sink: SlicingEventSinkRef = dispatcher.clone();
        let process = Arc::new(SimulatedProcess::new(sink, simulation));

        let mut bridge = Self {
            dispatcher,
            studio,
            presets,
            process,
            http: None,
            mqtt_events: None,
            ui_scheduler: Some(scheduler),
            ui_thread: Mutex::new(Some(ui_thread)),
            stopped: false,
        };

        if config.mqtt.enabled {
            bridge.start_mqtt(&config.mqtt)?;
        } else {
            tracing::info!("MQTT disabled");
        }

        if config.http.enabled {
            bridge.start_http(&config.http)?;
        } else {
            tracing::info!("HTTP API disabled");
        }

        Ok(bridge)
    }

    fn start_mqtt(&mut self, settings: &MqttSettings) -> anyhow::Result<()> {
        if let Some(publisher) = self.studio.mqtt_publisher() {
            publisher.set_credentials(settings.username.clone(), settings.password.clone());
            publisher.set_keepalive(Duration::from_secs(settings.keepalive_secs));
            publisher.set_topic_prefix(settings.topic_prefix.clone());
        }
        let config_connected = self.studio.init_mqtt(
            &settings.broker_host,
            settings.broker_port,
            &settings.client_id,
        );

        let events = Arc::new(MqttEventSink::new(event_sink_config(settings)?));
        match events.connect() {
            Ok(()) => {
                self.dispatcher.add_sink(events.clone());
                self.mqtt_events = Some(events);
            }
            Err(e) => tracing::warn!("MQTT event sink unavailable: {}", e),
        }

        if config_connected {
            let ready = self
                .studio
                .mqtt_publisher()
                .map(|p| p.wait_for_connection(MQTT_CONNECT_TIMEOUT))
                .unwrap_or(false);
            if ready {
                self.studio.publish_full_config();
            } else {
                tracing::warn!(
                    "Broker {}:{} not reachable yet, skipping initial config publish",
                    settings.broker_host,
                    settings.broker_port
                );
            }
        }
        Ok(())
    }

    fn start_http(&mut self, settings: &HttpApiSettings) -> anyhow::Result<()> {
        let process: Arc<dyn SlicingProcess> = self.process.clone();
        let mut api = HttpSlicerApi::new(http_config(settings), Some(process))
            .with_studio(self.studio.clone());
        if let Some(scheduler) = &self.ui_scheduler {
            api = api.with_ui(UiHooks::new(scheduler.clone(), Arc::new(HeadlessPresetsView)));
        }
        self.dispatcher.add_sink(Arc::new(api.event_sink()));
        api.start().with_context(|| {
            format!(
                "starting HTTP API on {}:{}",
                settings.bind_address, settings.port
            )
        })?;
        tracing::info!("HTTP API listening on port {}", api.port());
        self.http = Some(api);
        Ok(())
    }

    pub fn dispatcher(&self) -> &Arc<SlicingEventDispatcher> {
        &self.dispatcher
    }

    pub fn studio(&self) -> &Arc<Studio> {
        &self.studio
    }

    pub fn presets(&self) -> &SharedPresetStore {
        &self.presets
    }

    pub fn process(&self) -> &Arc<SimulatedProcess> {
        &self.process
    }

    pub fn http_api(&self) -> Option<&HttpSlicerApi> {
        self.http.as_ref()
    }

    /// Address the HTTP API is bound to, if it is running.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http.as_ref().and_then(|api| api.local_addr())
    }

    /// Stop every subsystem and wait for the UI loop to drain.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Some(api) = self.http.take() {
            api.stop();
        }
        self.process.reset();
        self.dispatcher.clear_sinks();
        self.studio.shutdown();
        if let Some(events) = self.mqtt_events.take() {
            events.disconnect();
        }
        self.ui_scheduler.take();
        if let Some(thread) = self.ui_thread.lock().take() {
            if thread.join().is_err() {
                tracing::error!("UI loop panicked");
            }
        }
        tracing::info!("SliceBridge stopped");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("sinks", &self.dispatcher.sink_count())
            .field("http", &self.http_addr())
            .field("mqtt_events", &self.mqtt_events.is_some())
            .finish()
    }
}
