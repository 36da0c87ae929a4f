//! Slicing event dispatcher.
//!
//! Fans slicing lifecycle events out to an ordered set of sinks. The
//! dispatcher is itself a [`SlicingEventSink`], so dispatchers nest.
//!
//! Each event holds the sink-list lock for the whole fan-out. Sinks must not
//! call back into the dispatcher that is delivering to them.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::events::{SlicingCompletedInfo, SlicingStatus};
use crate::sink::{same_sink, SlicingEventSink, SlicingEventSinkRef};

/// Thread-safe fan-out of slicing events to every installed sink.
#[derive(Default)]
pub struct SlicingEventDispatcher {
    sinks: Mutex<Vec<SlicingEventSinkRef>>,
}

impl SlicingEventDispatcher {
    /// Create a dispatcher with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a sink. It receives every event dispatched after this returns.
    pub fn add_sink(&self, sink: SlicingEventSinkRef) {
        let mut sinks = self.sinks.lock();
        sinks.push(sink);
        tracing::debug!("Slicing sink added ({} installed)", sinks.len());
    }

    /// Install a sink if one is given; `None` is ignored.
    pub fn add_sink_opt(&self, sink: Option<SlicingEventSinkRef>) {
        if let Some(sink) = sink {
            self.add_sink(sink);
        }
    }

    /// Remove every installed reference to `sink`.
    ///
    /// Returns the number of references removed.
    pub fn remove_sink(&self, sink: &SlicingEventSinkRef) -> usize {
        let mut sinks = self.sinks.lock();
        let before = sinks.len();
        sinks.retain(|s| !same_sink(s, sink));
        let removed = before - sinks.len();
        if removed > 0 {
            tracing::debug!("Slicing sink removed ({} installed)", sinks.len());
        }
        removed
    }

    /// Remove all sinks.
    pub fn clear_sinks(&self) {
        self.sinks.lock().clear();
    }

    /// Number of installed sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }

    fn dispatch(&self, event: &'static str, deliver: impl Fn(&dyn SlicingEventSink)) {
        let sinks = self.sinks.lock();
        for (index, sink) in sinks.iter().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| deliver(sink.as_ref())));
            if let Err(panic) = result {
                tracing::error!(
                    "Slicing sink #{} panicked in {}: {}",
                    index,
                    event,
                    panic_message(panic.as_ref())
                );
            }
        }
    }
}

impl SlicingEventSink for SlicingEventDispatcher {
    fn on_slicing_update(&self, status: &SlicingStatus) {
        self.dispatch("on_slicing_update", |sink| sink.on_slicing_update(status));
    }

    fn on_slicing_completed(&self, timestamp: i32) {
        self.dispatch("on_slicing_completed", |sink| {
            sink.on_slicing_completed(timestamp)
        });
    }

    fn on_process_finished(&self, info: &SlicingCompletedInfo) {
        self.dispatch("on_process_finished", |sink| sink.on_process_finished(info));
    }

    fn on_export_began(&self) {
        self.dispatch("on_export_began", |sink| sink.on_export_began());
    }

    fn on_export_finished(&self, path: &str) {
        self.dispatch("on_export_finished", |sink| sink.on_export_finished(path));
    }
}

impl std::fmt::Debug for SlicingEventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlicingEventDispatcher")
            .field("sinks", &self.sink_count())
            .finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
