//! Slicing lifecycle event types.
//!
//! These are the payloads a slicing engine hands to event sinks. They are
//! plain values: cheap to clone, serializable for the network sinks, and
//! immutable once built.

use serde::{Deserialize, Serialize};

/// Progress snapshot produced by the slicing engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicingStatus {
    /// Progress in percent, `0..=100`.
    pub percent: i32,
    /// Free-form progress text.
    pub message: String,
    /// Opaque engine flags.
    pub flags: u32,
    /// Warning step enumerant reported by the engine.
    pub warning_step: i32,
    /// Set when the status comes from the alternate (remote) engine.
    /// Travels as `is_helio` on the wire.
    #[serde(rename = "is_helio")]
    pub alternate_engine: bool,
}

impl SlicingStatus {
    /// Create a status with the given percent and message, other fields zeroed.
    pub fn new(percent: i32, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Attach engine flags.
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Attach a warning step.
    pub fn with_warning_step(mut self, warning_step: i32) -> Self {
        self.warning_step = warning_step;
        self
    }
}

/// Terminal outcome of a slicing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    /// Completed successfully
    #[default]
    Finished,
    /// Cancelled by the user
    Cancelled,
    /// Aborted with an error
    Error,
}

impl CompletionStatus {
    /// Wire name used in JSON payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a finished slicing + export run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicingCompletedInfo {
    /// Outcome of the run.
    pub status: CompletionStatus,
    /// Error text, if any.
    pub error_message: Option<String>,
    /// Objects the error refers to.
    pub error_object_ids: Vec<usize>,
    /// The error is critical (the plate cannot be sliced as is).
    pub critical_error: bool,
    /// The plater view must be invalidated.
    pub invalidate_plater: bool,
}

impl SlicingCompletedInfo {
    /// A successful completion.
    pub fn finished() -> Self {
        Self::default()
    }

    /// A user cancellation.
    pub fn cancelled() -> Self {
        Self {
            status: CompletionStatus::Cancelled,
            ..Default::default()
        }
    }

    /// A failed run with an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: CompletionStatus::Error,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// True when the run completed.
    pub fn is_finished(&self) -> bool {
        self.status == CompletionStatus::Finished
    }

    /// Alias of [`is_finished`](Self::is_finished).
    pub fn is_success(&self) -> bool {
        self.is_finished()
    }

    /// True when the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status == CompletionStatus::Cancelled
    }

    /// True when the run failed.
    pub fn is_error(&self) -> bool {
        self.status == CompletionStatus::Error
    }
}

/// Export phase marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPhase {
    /// G-code export started
    Began,
    /// G-code export finished
    Finished,
}

/// Export progress information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportInfo {
    /// Current phase.
    pub phase: ExportPhase,
    /// Output path, known once the export finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ExportInfo {
    /// Export has started.
    pub fn began() -> Self {
        Self {
            phase: ExportPhase::Began,
            path: None,
        }
    }

    /// Export wrote its output to `path`.
    pub fn finished(path: impl Into<String>) -> Self {
        Self {
            phase: ExportPhase::Finished,
            path: Some(path.into()),
        }
    }
}
