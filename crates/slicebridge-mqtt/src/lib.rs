//! # SliceBridge MQTT
//!
//! Publishes configuration changes and slicing lifecycle events to an MQTT
//! broker (protocol version 5).
//!
//! - [`TopicRouter`]: static option key to topic mapping, loaded from
//!   `data/topic_routes.toml`
//! - [`envelope`]: the JSON payload wrapping a value, its type and metadata
//! - [`MqttConfigPublisher`]: config bus listener and preset snapshot publisher
//! - [`MqttEventSink`]: slicing event sink
//! - [`Transport`]: the publish seam, implemented by [`MqttLink`] (rumqttc)
//!   and [`MemoryTransport`] (in-process broker stand-in)

pub mod envelope;
pub mod error;
pub mod event_sink;
pub mod link;
pub mod memory;
pub mod publisher;
pub mod routing;
pub mod transport;

pub use error::{MqttError, MqttResult};
pub use event_sink::{EventSinkConfig, MqttEventSink};
pub use link::{LinkOptions, MqttLink};
pub use memory::{MemoryTransport, PublishedMessage};
pub use publisher::MqttConfigPublisher;
pub use routing::{TopicRoute, TopicRouter};
pub use transport::{qos_from_level, QoS, Transport, TransportRef};
