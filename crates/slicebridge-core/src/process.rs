//! Slicing process control interface.

use serde::Serialize;
use std::sync::Arc;

/// Control surface of the background slicing process.
///
/// Implementations must return promptly; the control façade calls these
/// from request handlers.
pub trait SlicingProcess: Send + Sync {
    /// Start slicing. Returns false when already running or nothing to slice.
    fn start(&self) -> bool;
    /// Stop slicing. Returns false when not running.
    fn stop(&self) -> bool;
    /// Drop results and return to idle.
    fn reset(&self);

    fn idle(&self) -> bool;
    fn running(&self) -> bool;
    fn finished(&self) -> bool;
    /// No objects to slice.
    fn empty(&self) -> bool;

    /// Snapshot of the four state predicates.
    fn state(&self) -> ProcessState {
        ProcessState {
            idle: self.idle(),
            running: self.running(),
            finished: self.finished(),
            empty: self.empty(),
        }
    }
}

/// Shared handle to a slicing process.
pub type SlicingProcessRef = Arc<dyn SlicingProcess>;

/// State predicates of a slicing process at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessState {
    pub idle: bool,
    pub running: bool,
    pub finished: bool,
    pub empty: bool,
}
