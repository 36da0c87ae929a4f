//! # SliceBridge Core
//!
//! Core types, traits, and utilities for SliceBridge.
//! Provides the slicing lifecycle event model, the multi-sink event
//! dispatcher, the configuration change bus, and the interfaces of the
//! collaborators the bridge consumes (slicing process, preset store,
//! option schema, UI loop).

pub mod config_bus;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod options;
pub mod presets;
pub mod process;
pub mod sink;
pub mod types;
pub mod ui;

pub use config_bus::{config_bus, ConfigCallback, ConfigChangeBus, ConfigChangeListener};
pub use dispatcher::SlicingEventDispatcher;
pub use error::{Error, PresetError, Result, SchemaError};
pub use events::{CompletionStatus, ExportInfo, ExportPhase, SlicingCompletedInfo, SlicingStatus};
pub use options::{
    ConfigOption, OptionMetadata, OptionValue, PrintConfig, SchemaRegistry, StaticSchemaRegistry,
};
pub use presets::{
    CompatibleSelect, Preset, PresetBundle, PresetCollection, PresetKind, PresetStore,
    SharedPresetStore,
};
pub use process::{ProcessState, SlicingProcess, SlicingProcessRef};
pub use sink::{SlicingEventSink, SlicingEventSinkRef};
pub use ui::{
    PresetsView, QueueUiScheduler, UiEvent, UiEventHandler, UiEventSink, UiQueue, UiScheduler, UiTask,
};

pub use types::{thread_safe, ThreadSafe};
