//! rumqttc-backed transport.
//!
//! Uses the MQTT v5 blocking client. The network loop runs on its own
//! thread and owns the `Connection`; publishes are enqueued with
//! `try_publish` so callers never block on the socket.

use parking_lot::Mutex;
use rumqttc::v5::mqttbytes::v5::{ConnectReturnCode, Packet};
use rumqttc::v5::{Client, Connection, Event, MqttOptions};
use rumqttc::Outgoing;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{MqttError, MqttResult};
use crate::transport::{QoS, Transport};

/// Capacity of the client request queue.
const REQUEST_CAPACITY: usize = 256;

/// Pause between reconnect attempts after a network error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Broker connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keepalive: Duration,
}

impl LinkOptions {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            username: None,
            password: None,
            keepalive: Duration::from_secs(60),
        }
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    fn to_mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keepalive);
        options.set_clean_start(true);
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }
        options
    }
}

/// Live MQTT client with a background network loop.
pub struct MqttLink {
    client: Mutex<Option<Client>>,
    connected: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    endpoint: String,
}

impl MqttLink {
    /// Create the client and start its network loop.
    ///
    /// Returns as soon as the loop thread runs; the broker handshake
    /// completes in the background and flips [`is_connected`](Transport::is_connected).
    pub fn connect(options: &LinkOptions) -> MqttResult<Self> {
        if options.host.trim().is_empty() {
            return Err(MqttError::ConnectionFailed("empty broker host".to_string()));
        }

        let (client, connection) = Client::new(options.to_mqtt_options(), REQUEST_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));
        let stopping = Arc::new(AtomicBool::new(false));
        let endpoint = format!("{}:{}", options.host, options.port);

        let worker = {
            let connected = connected.clone();
            let stopping = stopping.clone();
            let endpoint = endpoint.clone();
            std::thread::Builder::new()
                .name(format!("mqtt-{}", options.client_id))
                .spawn(move || run_network_loop(connection, connected, stopping, endpoint))?
        };

        tracing::info!(
            "MQTT client '{}' connecting to {}",
            options.client_id,
            endpoint
        );

        Ok(Self {
            client: Mutex::new(Some(client)),
            connected,
            stopping,
            worker: Mutex::new(Some(worker)),
            endpoint,
        })
    }

    /// Wait up to `timeout` for the broker handshake.
    pub fn wait_for_connection(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.is_connected() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        self.is_connected()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn run_network_loop(
    mut connection: Connection,
    connected: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    endpoint: String,
) {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    connected.store(true, Ordering::SeqCst);
                    tracing::info!("MQTT connected to {}", endpoint);
                } else {
                    connected.store(false, Ordering::SeqCst);
                    tracing::warn!("MQTT broker {} refused connection: {:?}", endpoint, ack.code);
                }
            }
            Ok(Event::Incoming(Packet::Disconnect(_))) => {
                connected.store(false, Ordering::SeqCst);
                tracing::warn!("MQTT broker {} closed the session", endpoint);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.store(false, Ordering::SeqCst);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                connected.store(false, Ordering::SeqCst);
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                tracing::warn!("MQTT connection to {} failed: {}", endpoint, e);
                std::thread::sleep(RECONNECT_DELAY);
            }
        }
    }
    tracing::debug!("MQTT network loop for {} stopped", endpoint);
}

impl Transport for MqttLink {
    fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retained: bool) -> MqttResult<()> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected);
        }
        let guard = self.client.lock();
        let client = guard.as_ref().ok_or(MqttError::NotConnected)?;
        client
            .try_publish(topic, qos, retained, payload.to_vec())
            .map_err(|e| MqttError::Client(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        if let Some(client) = self.client.lock().take() {
            if let Err(e) = client.try_disconnect() {
                tracing::debug!("MQTT disconnect request to {} not queued: {}", self.endpoint, e);
            }
        }
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("MQTT network loop for {} panicked", self.endpoint);
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for MqttLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}
