//! Dynamically typed option values carried on the config bus.

use serde::{Deserialize, Serialize};

/// A configuration value with its shape carried explicitly.
///
/// `FloatOrPercent` holds the rendered text (`"0.4"` or `"50%"`) and travels
/// as a string on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    /// Boolean value
    Bool(bool),
    /// Integer value (enums travel as their integer)
    Int(i64),
    /// Floating point value (percents travel as their number)
    Float(f64),
    /// Text value
    String(String),
    /// Sequence of text values
    Strings(Vec<String>),
    /// Sequence of floats
    Floats(Vec<f64>),
    /// Sequence of integers
    Ints(Vec<i64>),
    /// Pre-rendered float-or-percent text
    FloatOrPercent(String),
    /// A value of a shape the bridge does not understand
    Unknown,
}

impl OptionValue {
    /// Wire name of the value's shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) | Self::FloatOrPercent(_) => "string",
            Self::Strings(_) => "strings",
            Self::Floats(_) => "floats",
            Self::Ints(_) => "ints",
            Self::Unknown => "unknown",
        }
    }

    /// True for the sequence shapes.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Strings(_) | Self::Floats(_) | Self::Ints(_))
    }

    /// Borrow the value as a float, if it holds one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Borrow the value as text, if it holds text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::FloatOrPercent(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        Self::Strings(v)
    }
}

impl From<Vec<f64>> for OptionValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Floats(v)
    }
}

impl From<Vec<i64>> for OptionValue {
    fn from(v: Vec<i64>) -> Self {
        Self::Ints(v)
    }
}
