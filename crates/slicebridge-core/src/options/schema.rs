//! Option schema: per-key metadata used to annotate published values.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{Error, Result, SchemaError};

/// Metadata describing one option key.
///
/// Numeric bounds are absent when the option is unbounded on that side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionMetadata {
    pub label: String,
    pub category: String,
    pub tooltip: String,
    /// Unit text shown next to the value (`mm`, `mm/s`, `%`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Enum key to integer value, ordered by key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_keys: Option<BTreeMap<String, i64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_labels: Vec<String>,
}

impl OptionMetadata {
    pub fn new(label: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    fn validate(&self, key: &str) -> std::result::Result<(), SchemaError> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(SchemaError::InvertedBounds {
                    key: key.to_string(),
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Source of option metadata.
pub trait SchemaRegistry: Send + Sync {
    /// Metadata for `opt_key`, if the registry defines it.
    fn get(&self, opt_key: &str) -> Option<&OptionMetadata>;
}

/// Schema registry backed by a TOML table of option definitions.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaRegistry {
    options: HashMap<String, OptionMetadata>,
}

const BUILTIN_SCHEMA: &str = include_str!("../../data/print_options.toml");

impl StaticSchemaRegistry {
    /// Registry with no definitions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry built from the bundled option table.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_SCHEMA)
    }

    /// Parse a TOML document whose top-level tables are option keys.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: HashMap<String, OptionMetadata> =
            toml::from_str(content).map_err(|e| SchemaError::Malformed {
                reason: e.to_string(),
            })?;
        for (key, meta) in &options {
            meta.validate(key)?;
        }
        tracing::debug!("Loaded {} option definitions", options.len());
        Ok(Self { options })
    }

    /// Load a schema table from a file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_toml_str(&content)
    }

    /// Add or replace one definition.
    pub fn insert(&mut self, key: impl Into<String>, meta: OptionMetadata) -> Result<()> {
        let key = key.into();
        meta.validate(&key)?;
        self.options.insert(key, meta);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl SchemaRegistry for StaticSchemaRegistry {
    fn get(&self, opt_key: &str) -> Option<&OptionMetadata> {
        self.options.get(opt_key)
    }
}
