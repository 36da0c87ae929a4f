//! Error handling for SliceBridge
//!
//! Provides error types for the core layer:
//! - Preset errors (lookup of selected names)
//! - Schema errors (option metadata data files)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Preset error type
///
/// Raised when a bundle names a preset it does not contain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    /// No preset with that name exists in the collection
    #[error("Preset not found: {name}")]
    NotFound {
        /// The requested preset name.
        name: String,
    },
}

/// Schema error type
///
/// Raised when the option metadata table cannot be parsed.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    /// The schema data file is malformed
    #[error("Malformed option schema: {reason}")]
    Malformed {
        /// The parser diagnostic.
        reason: String,
    },

    /// An option declares an inverted numeric range
    #[error("Option '{key}' has min {min} greater than max {max}")]
    InvertedBounds {
        /// The option key.
        key: String,
        /// Declared minimum.
        min: f64,
        /// Declared maximum.
        max: f64,
    },
}

/// Main error type for SliceBridge core
///
/// A unified error type that can represent any error from the core layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Preset error
    #[error(transparent)]
    Preset(#[from] PresetError),

    /// Schema error
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this is a "preset not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Preset(PresetError::NotFound { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
