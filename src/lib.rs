//! # SliceBridge
//!
//! Event and configuration bridge for a headless slicing engine:
//! - Fans slicing lifecycle events out to the UI, an MQTT broker and an
//!   HTTP status cache
//! - Publishes every configuration change to per-option MQTT topics
//! - Serves a REST API for process control and preset selection
//!
//! ## Architecture
//!
//! SliceBridge is organized as a workspace with multiple crates:
//!
//! 1. **slicebridge-core** - Events, sinks, dispatcher, config change bus, presets
//! 2. **slicebridge-settings** - File based configuration
//! 3. **slicebridge-mqtt** - Topic routing, JSON envelopes, broker link, publishers
//! 4. **slicebridge-api** - Studio services and the HTTP control API
//! 5. **slicebridge** - Main binary that wires the crates together

pub mod bridge;
pub mod simulator;

pub use bridge::Bridge;
pub use simulator::{SimulatedProcess, SimulationOptions};

pub use slicebridge_api as api;
pub use slicebridge_mqtt as mqtt;
pub use slicebridge_settings as settings;

pub use slicebridge_core::{
    ProcessState, SlicingCompletedInfo, SlicingEventDispatcher, SlicingEventSink,
    SlicingProcess, SlicingStatus,
};
pub use slicebridge_settings::{Config, LoggingSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - RUST_LOG environment variable support, falling back to the configured level
/// - Pretty console output, or JSON lines when `json` is set
///
/// Calling it again after a subscriber is installed is an error.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if settings.json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_thread_names(true)
            .json();
        registry.with(fmt_layer).try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .pretty();
        registry.with(fmt_layer).try_init()?;
    }

    Ok(())
}
