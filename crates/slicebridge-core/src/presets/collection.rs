use serde::{Deserialize, Serialize};

use super::preset::{Preset, PresetKind};

/// What to do with a selected preset that became incompatible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibleSelect {
    /// Keep the current selection
    #[default]
    Never,
    /// Reselect only if the selection was compatible before the update
    OnlyIfWasCompatible,
    /// Always move to a compatible preset
    Always,
}

/// Ordered presets of one kind with a current selection.
#[derive(Debug, Clone)]
pub struct PresetCollection {
    kind: PresetKind,
    presets: Vec<Preset>,
    selected: Option<usize>,
}

impl PresetCollection {
    pub fn new(kind: PresetKind) -> Self {
        Self {
            kind,
            presets: Vec::new(),
            selected: None,
        }
    }

    /// Build a collection; the first visible preset becomes selected.
    pub fn with_presets(kind: PresetKind, presets: Vec<Preset>) -> Self {
        let selected = presets.iter().position(|p| p.is_visible);
        Self {
            kind,
            presets,
            selected,
        }
    }

    pub fn kind(&self) -> PresetKind {
        self.kind
    }

    /// Add a preset, replacing one with the same name. Returns its index.
    pub fn add(&mut self, preset: Preset) -> usize {
        if let Some(idx) = self.index_of(&preset.name) {
            self.presets[idx] = preset;
            return idx;
        }
        self.presets.push(preset);
        let idx = self.presets.len() - 1;
        if self.selected.is_none() && self.presets[idx].is_visible {
            self.selected = Some(idx);
        }
        idx
    }

    pub fn get_presets(&self) -> &[Preset] {
        &self.presets
    }

    /// Find a preset by name. With `must_be_system`, only system presets match.
    pub fn find_preset(&self, name: &str, must_be_system: bool) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|p| p.name == name && (!must_be_system || p.is_system))
    }

    pub fn find_preset_mut(&mut self, name: &str, must_be_system: bool) -> Option<&mut Preset> {
        self.presets
            .iter_mut()
            .find(|p| p.name == name && (!must_be_system || p.is_system))
    }

    /// Select a preset by name.
    ///
    /// Hidden presets are selected only when `force` is set. Returns false
    /// when nothing was selected.
    pub fn select_preset_by_name(&mut self, name: &str, force: bool) -> bool {
        match self.index_of(name) {
            Some(idx) if force || self.presets[idx].is_visible => {
                self.selected = Some(idx);
                tracing::debug!("Selected {} preset '{}'", self.kind, name);
                true
            }
            _ => false,
        }
    }

    pub fn get_selected_preset(&self) -> Option<&Preset> {
        self.selected.and_then(|idx| self.presets.get(idx))
    }

    /// Name of the selected preset, empty when nothing is selected.
    pub fn get_selected_preset_name(&self) -> &str {
        self.get_selected_preset()
            .map(|p| p.name.as_str())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Recompute `is_compatible` against `printer` and apply `select`.
    pub(crate) fn update_compatible(&mut self, printer: Option<&str>, select: CompatibleSelect) {
        let was_compatible = self
            .get_selected_preset()
            .map(|p| p.is_compatible)
            .unwrap_or(false);

        for preset in &mut self.presets {
            preset.is_compatible = printer.map_or(true, |name| preset.is_compatible_with(name));
        }

        let still_compatible = self
            .get_selected_preset()
            .map(|p| p.is_compatible)
            .unwrap_or(true);
        let reselect = match select {
            CompatibleSelect::Never => false,
            CompatibleSelect::OnlyIfWasCompatible => was_compatible && !still_compatible,
            CompatibleSelect::Always => !still_compatible,
        };
        if reselect {
            if let Some(idx) = self
                .presets
                .iter()
                .position(|p| p.is_visible && p.is_compatible)
            {
                tracing::debug!(
                    "Reselected {} preset '{}' after compatibility update",
                    self.kind,
                    self.presets[idx].name
                );
                self.selected = Some(idx);
            }
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.presets.iter().position(|p| p.name == name)
    }
}
