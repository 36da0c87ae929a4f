use serde::{Deserialize, Serialize};

use crate::options::{ConfigOption, PrintConfig};

/// Kind of configuration a preset carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    Print,
    Filament,
    Printer,
}

impl PresetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Filament => "filament",
            Self::Printer => "printer",
        }
    }
}

impl std::fmt::Display for PresetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// A named configuration bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_external: bool,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default = "default_true")]
    pub is_compatible: bool,
    #[serde(default)]
    pub config: PrintConfig,
}

impl Preset {
    /// A visible, compatible user preset.
    pub fn new(name: impl Into<String>, config: PrintConfig) -> Self {
        Self {
            name: name.into(),
            is_system: false,
            is_default: false,
            is_external: false,
            is_visible: true,
            is_compatible: true,
            config,
        }
    }

    /// Mark the preset as a vendor (system) preset.
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    /// First element of a string option, skipping empty values.
    ///
    /// Accepts both scalar and vector string options.
    pub fn first_string(&self, key: &str) -> Option<&str> {
        let text = match self.config.option(key)? {
            ConfigOption::String(s) => s.as_str(),
            ConfigOption::Strings(v) => v.first()?.as_str(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    /// Whether this preset may be used with `printer`.
    ///
    /// An absent or empty `compatible_printers` list means any printer.
    pub fn is_compatible_with(&self, printer: &str) -> bool {
        match self.config.option("compatible_printers") {
            Some(ConfigOption::Strings(list)) if !list.is_empty() => {
                list.iter().any(|p| p == printer)
            }
            _ => true,
        }
    }
}
