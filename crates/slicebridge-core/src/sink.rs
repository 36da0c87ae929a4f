//! Slicing event sink interface
//!
//! Defines the contract every recipient of slicing lifecycle events
//! implements: the UI adapter, the MQTT sink, the HTTP status cache, and the
//! dispatcher itself.

use crate::events::{SlicingCompletedInfo, SlicingStatus};
use std::sync::Arc;

/// Receiver of slicing lifecycle events.
///
/// Implementations are invoked from the slicing worker thread, not from the
/// thread that installed them. They must return promptly; work that belongs
/// to another execution context (a UI loop, a network loop) is handed off
/// internally. A panicking sink is isolated by the dispatcher.
pub trait SlicingEventSink: Send + Sync {
    /// Progress update, called frequently while slicing.
    fn on_slicing_update(&self, status: &SlicingStatus);

    /// Slicing phase finished and export is about to start.
    fn on_slicing_completed(&self, timestamp: i32);

    /// All processing (slicing and export) finished.
    fn on_process_finished(&self, info: &SlicingCompletedInfo);

    /// G-code export started.
    fn on_export_began(&self);

    /// G-code export finished, writing to `path`.
    fn on_export_finished(&self, path: &str);
}

/// Owning handle to a sink. The dispatcher shares ownership with the installer.
pub type SlicingEventSinkRef = Arc<dyn SlicingEventSink>;

/// Identity comparison of two sink handles (data pointer only).
pub fn same_sink(a: &SlicingEventSinkRef, b: &SlicingEventSinkRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
