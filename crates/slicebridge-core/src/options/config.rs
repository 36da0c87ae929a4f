//! Typed stored options and the option map of a preset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::value::OptionValue;

/// A stored configuration option, typed the way the preset store keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfigOption {
    Bool(bool),
    Int(i64),
    Float(f64),
    Percent(f64),
    String(String),
    FloatOrPercent { value: f64, percent: bool },
    /// Enumerated option, stored as its integer value
    Enum(i64),
    Floats(Vec<f64>),
    Percents(Vec<f64>),
    Ints(Vec<i64>),
    Bools(Vec<bool>),
    Strings(Vec<String>),
    Points(Vec<(f64, f64)>),
}

impl ConfigOption {
    /// True for per-element (vector) option kinds.
    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            Self::Floats(_)
                | Self::Percents(_)
                | Self::Ints(_)
                | Self::Bools(_)
                | Self::Strings(_)
                | Self::Points(_)
        )
    }

    /// Number of elements; scalars count as one.
    pub fn len(&self) -> usize {
        match self {
            Self::Floats(v) | Self::Percents(v) => v.len(),
            Self::Ints(v) => v.len(),
            Self::Bools(v) => v.len(),
            Self::Strings(v) => v.len(),
            Self::Points(v) => v.len(),
            _ => 1,
        }
    }

    /// True for a vector option with no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert a scalar option to a bus value.
    ///
    /// Percents become floats, enums become ints and float-or-percent values
    /// are rendered to text. Vector kinds yield `None`.
    pub fn to_scalar_value(&self) -> Option<OptionValue> {
        match self {
            Self::Bool(v) => Some(OptionValue::Bool(*v)),
            Self::Int(v) | Self::Enum(v) => Some(OptionValue::Int(*v)),
            Self::Float(v) | Self::Percent(v) => Some(OptionValue::Float(*v)),
            Self::String(v) => Some(OptionValue::String(v.clone())),
            Self::FloatOrPercent { value, percent } => Some(OptionValue::FloatOrPercent(
                render_float_or_percent(*value, *percent),
            )),
            _ => None,
        }
    }

    /// Convert to a bus value, accepting float, int and string vectors
    /// whole in addition to the scalar kinds.
    pub fn to_value(&self) -> Option<OptionValue> {
        match self {
            Self::Floats(v) => Some(OptionValue::Floats(v.clone())),
            Self::Ints(v) => Some(OptionValue::Ints(v.clone())),
            Self::Strings(v) => Some(OptionValue::Strings(v.clone())),
            other => other.to_scalar_value(),
        }
    }

    /// Element `idx` of a vector option as a scalar bus value.
    ///
    /// Points render as `"x,y"`. Returns `None` for scalars and when `idx`
    /// is out of range.
    pub fn value_at(&self, idx: usize) -> Option<OptionValue> {
        match self {
            Self::Floats(v) | Self::Percents(v) => v.get(idx).map(|x| OptionValue::Float(*x)),
            Self::Ints(v) => v.get(idx).map(|x| OptionValue::Int(*x)),
            Self::Bools(v) => v.get(idx).map(|x| OptionValue::Bool(*x)),
            Self::Strings(v) => v.get(idx).map(|x| OptionValue::String(x.clone())),
            Self::Points(v) => v
                .get(idx)
                .map(|(x, y)| OptionValue::String(format!("{},{}", x, y))),
            _ => None,
        }
    }

    /// Name of the stored kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Percent(_) => "percent",
            Self::String(_) => "string",
            Self::FloatOrPercent { .. } => "float_or_percent",
            Self::Enum(_) => "enum",
            Self::Floats(_) => "floats",
            Self::Percents(_) => "percents",
            Self::Ints(_) => "ints",
            Self::Bools(_) => "bools",
            Self::Strings(_) => "strings",
            Self::Points(_) => "points",
        }
    }
}

fn render_float_or_percent(value: f64, percent: bool) -> String {
    if percent {
        format!("{}%", value)
    } else {
        format!("{}", value)
    }
}

/// Option map of a preset, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrintConfig {
    options: BTreeMap<String, ConfigOption>,
}

impl PrintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an option.
    pub fn option(&self, key: &str) -> Option<&ConfigOption> {
        self.options.get(key)
    }

    /// Insert or replace an option, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, option: ConfigOption) -> Option<ConfigOption> {
        self.options.insert(key.into(), option)
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, option: ConfigOption) -> Self {
        self.set(key, option);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigOption> {
        self.options.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    /// Options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigOption)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy every option of `other` over this map.
    pub fn apply(&mut self, other: &PrintConfig) {
        for (key, option) in other.iter() {
            self.options.insert(key.to_string(), option.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl FromIterator<(String, ConfigOption)> for PrintConfig {
    fn from_iter<I: IntoIterator<Item = (String, ConfigOption)>>(iter: I) -> Self {
        Self {
            options: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(
            ConfigOption::Percent(15.0).to_scalar_value(),
            Some(OptionValue::Float(15.0))
        );
        assert_eq!(
            ConfigOption::Enum(2).to_scalar_value(),
            Some(OptionValue::Int(2))
        );
        assert_eq!(
            ConfigOption::FloatOrPercent {
                value: 50.0,
                percent: true
            }
            .to_scalar_value(),
            Some(OptionValue::FloatOrPercent("50%".into()))
        );
        assert_eq!(
            ConfigOption::FloatOrPercent {
                value: 0.45,
                percent: false
            }
            .to_scalar_value(),
            Some(OptionValue::FloatOrPercent("0.45".into()))
        );
        assert_eq!(ConfigOption::Floats(vec![0.4]).to_scalar_value(), None);
    }

    #[test]
    fn test_vector_conversion() {
        assert_eq!(
            ConfigOption::Floats(vec![0.4, 0.6]).to_value(),
            Some(OptionValue::Floats(vec![0.4, 0.6]))
        );
        assert_eq!(ConfigOption::Bools(vec![true]).to_value(), None);
        assert_eq!(ConfigOption::Points(vec![(0.0, 0.0)]).to_value(), None);
    }

    #[test]
    fn test_value_at() {
        let points = ConfigOption::Points(vec![(0.0, 0.0), (25.5, -3.0)]);
        assert_eq!(points.value_at(1), Some(OptionValue::String("25.5,-3".into())));
        assert_eq!(points.value_at(2), None);

        let bools = ConfigOption::Bools(vec![false, true]);
        assert_eq!(bools.value_at(1), Some(OptionValue::Bool(true)));
        assert_eq!(ConfigOption::Float(1.0).value_at(0), None);
    }

    #[test]
    fn test_print_config_is_sorted() {
        let config = PrintConfig::new()
            .with("wall_loops", ConfigOption::Int(3))
            .with("layer_height", ConfigOption::Float(0.2));
        let keys: Vec<&str> = config.keys().collect();
        assert_eq!(keys, vec!["layer_height", "wall_loops"]);
    }

    #[test]
    fn test_print_config_json_shape() {
        let config = PrintConfig::new().with("nozzle_diameter", ConfigOption::Floats(vec![0.4]));
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"nozzle_diameter":{"type":"floats","value":[0.4]}}"#);
    }
}
