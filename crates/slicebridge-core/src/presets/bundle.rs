use serde::Deserialize;
use std::path::Path;

use super::collection::{CompatibleSelect, PresetCollection};
use super::preset::{Preset, PresetKind};
use super::PresetStore;
use crate::error::{Error, PresetError, Result};
use crate::options::PrintConfig;

/// In-memory preset store.
#[derive(Debug, Clone)]
pub struct PresetBundle {
    pub prints: PresetCollection,
    pub printers: PresetCollection,
    pub filaments: PresetCollection,
    filament_presets: Vec<String>,
}

/// On-disk layout of a preset bundle.
#[derive(Debug, Deserialize)]
struct BundleFile {
    #[serde(default)]
    prints: Vec<Preset>,
    #[serde(default)]
    printers: Vec<Preset>,
    #[serde(default)]
    filaments: Vec<Preset>,
    #[serde(default)]
    selected_print: Option<String>,
    #[serde(default)]
    selected_printer: Option<String>,
    #[serde(default)]
    filament_presets: Vec<String>,
}

impl Default for PresetBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetBundle {
    /// Empty bundle with a single extruder and no filament assigned.
    pub fn new() -> Self {
        Self {
            prints: PresetCollection::new(PresetKind::Print),
            printers: PresetCollection::new(PresetKind::Printer),
            filaments: PresetCollection::new(PresetKind::Filament),
            filament_presets: vec![String::new()],
        }
    }

    /// Parse a bundle from JSON.
    ///
    /// Selected names that do not exist are rejected. Without an explicit
    /// `filament_presets` list, every extruder of the selected printer gets
    /// the first filament.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: BundleFile = serde_json::from_str(content)?;

        let mut bundle = Self {
            prints: PresetCollection::with_presets(PresetKind::Print, file.prints),
            printers: PresetCollection::with_presets(PresetKind::Printer, file.printers),
            filaments: PresetCollection::with_presets(PresetKind::Filament, file.filaments),
            filament_presets: file.filament_presets,
        };

        if let Some(name) = file.selected_print {
            select_or_reject(&mut bundle.prints, &name)?;
        }
        if let Some(name) = file.selected_printer {
            select_or_reject(&mut bundle.printers, &name)?;
        }

        if bundle.filament_presets.is_empty() {
            let first = bundle
                .filaments
                .get_presets()
                .first()
                .map(|p| p.name.clone())
                .unwrap_or_default();
            bundle.filament_presets = vec![first; bundle.extruder_count()];
        }
        for name in &bundle.filament_presets {
            if !name.is_empty() && bundle.filaments.find_preset(name, false).is_none() {
                return Err(PresetError::NotFound { name: name.clone() }.into());
            }
        }
        if let Some(first) = bundle.filament_presets.first().cloned() {
            bundle.filaments.select_preset_by_name(&first, true);
        }

        bundle.update_compatible(CompatibleSelect::Never, CompatibleSelect::Never);
        tracing::info!(
            "Loaded preset bundle: {} printers, {} filaments, {} prints",
            bundle.printers.len(),
            bundle.filaments.len(),
            bundle.prints.len()
        );
        Ok(bundle)
    }

    /// Load a bundle from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_json_str(&content)
    }

    /// Extruder count of the selected printer, from the length of its
    /// `nozzle_diameter` option (one when absent).
    pub fn extruder_count(&self) -> usize {
        self.printers
            .get_selected_preset()
            .and_then(|p| p.config.option("nozzle_diameter"))
            .filter(|opt| opt.is_vector() && !opt.is_empty())
            .map(|opt| opt.len())
            .unwrap_or(1)
    }
}

fn select_or_reject(collection: &mut PresetCollection, name: &str) -> Result<()> {
    if collection.select_preset_by_name(name, true) {
        Ok(())
    } else {
        Err(PresetError::NotFound {
            name: name.to_string(),
        }
        .into())
    }
}

impl PresetStore for PresetBundle {
    fn printers(&self) -> &PresetCollection {
        &self.printers
    }

    fn printers_mut(&mut self) -> &mut PresetCollection {
        &mut self.printers
    }

    fn filaments(&self) -> &PresetCollection {
        &self.filaments
    }

    fn filaments_mut(&mut self) -> &mut PresetCollection {
        &mut self.filaments
    }

    fn filament_presets(&self) -> &[String] {
        &self.filament_presets
    }

    fn set_filament_preset(&mut self, idx: usize, name: &str) {
        if idx >= self.filament_presets.len() {
            self.filament_presets.resize(idx + 1, String::new());
        }
        self.filament_presets[idx] = name.to_string();
    }

    fn update_compatible(&mut self, select_print: CompatibleSelect, select_filament: CompatibleSelect) {
        let printer = self
            .printers
            .get_selected_preset()
            .map(|p| p.name.clone());
        self.prints.update_compatible(printer.as_deref(), select_print);
        self.filaments
            .update_compatible(printer.as_deref(), select_filament);
    }

    fn full_config(&self) -> PrintConfig {
        let mut config = PrintConfig::new();
        for collection in [&self.prints, &self.printers] {
            if let Some(preset) = collection.get_selected_preset() {
                config.apply(&preset.config);
            }
        }
        let filament = self
            .filament_presets
            .first()
            .and_then(|name| self.filaments.find_preset(name, false))
            .or_else(|| self.filaments.get_selected_preset());
        if let Some(preset) = filament {
            config.apply(&preset.config);
        }
        config
    }
}
