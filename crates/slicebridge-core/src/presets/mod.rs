//! # Presets Module
//!
//! Named configuration bundles (printer, filament, print) and the store the
//! control façade reads and mutates. The store itself is an external
//! collaborator; [`PresetStore`] is the interface the bridge consumes and
//! [`PresetBundle`] is an in-memory implementation loadable from JSON.

mod bundle;
mod collection;
mod preset;

pub use bundle::PresetBundle;
pub use collection::{CompatibleSelect, PresetCollection};
pub use preset::{Preset, PresetKind};

use parking_lot::Mutex;
use std::sync::Arc;

use crate::options::PrintConfig;

/// Preset storage consumed by the control façade.
pub trait PresetStore: Send {
    fn printers(&self) -> &PresetCollection;
    fn printers_mut(&mut self) -> &mut PresetCollection;
    fn filaments(&self) -> &PresetCollection;
    fn filaments_mut(&mut self) -> &mut PresetCollection;

    /// Selected filament name per extruder.
    fn filament_presets(&self) -> &[String];

    /// Assign filament `name` to extruder `idx`.
    fn set_filament_preset(&mut self, idx: usize, name: &str);

    /// Recompute compatibility of print and filament presets against the
    /// selected printer, reselecting according to the given policies.
    fn update_compatible(&mut self, select_print: CompatibleSelect, select_filament: CompatibleSelect);

    /// Merged configuration of every selected preset.
    fn full_config(&self) -> PrintConfig;
}

/// Shared handle to a preset store.
pub type SharedPresetStore = Arc<Mutex<dyn PresetStore>>;
