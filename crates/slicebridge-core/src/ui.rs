//! UI loop marshalling.
//!
//! The bridge never touches UI state from worker threads. Work meant for
//! the UI is posted as a [`UiTask`] to a [`UiScheduler`] and runs later on
//! the thread that drains the queue.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::events::{SlicingCompletedInfo, SlicingStatus};
use crate::presets::PresetKind;
use crate::sink::SlicingEventSink;

/// Unit of work executed on the UI thread.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Posts work onto the UI loop.
pub trait UiScheduler: Send + Sync {
    /// Queue `task`. Returns without waiting for it to run.
    fn post(&self, task: UiTask);
}

/// UI surface refreshed after preset changes.
pub trait PresetsView: Send + Sync {
    /// Reload the preset selector of the given kind.
    fn update_presets(&self, kind: PresetKind);
    /// Flag the current project as modified by a preset change.
    fn mark_project_dirty(&self);
}

/// Scheduler backed by a channel drained by a [`UiQueue`].
#[derive(Clone)]
pub struct QueueUiScheduler {
    tx: mpsc::Sender<UiTask>,
}

/// Receiving end of a [`QueueUiScheduler`].
pub struct UiQueue {
    rx: mpsc::Receiver<UiTask>,
}

impl QueueUiScheduler {
    /// Create a scheduler and the queue that executes its tasks.
    pub fn new() -> (Self, UiQueue) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, UiQueue { rx })
    }
}

impl UiScheduler for QueueUiScheduler {
    fn post(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            tracing::warn!("UI queue closed, task dropped");
        }
    }
}

impl UiQueue {
    /// Run every task queued so far. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Run tasks until every scheduler handle is dropped.
    pub fn run(self) {
        while let Ok(task) = self.rx.recv() {
            task();
        }
        tracing::debug!("UI queue drained");
    }

    /// Run the queue on its own thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("ui-loop".to_string())
            .spawn(move || self.run())
    }
}

/// A slicing event as delivered to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SlicingUpdate(SlicingStatus),
    SlicingCompleted { timestamp: i32 },
    ProcessFinished(SlicingCompletedInfo),
    ExportBegan,
    ExportFinished { path: String },
}

/// Handler run on the UI thread for each event.
pub type UiEventHandler = Arc<dyn Fn(UiEvent) + Send + Sync>;

/// Sink that forwards every slicing event to the UI thread.
pub struct UiEventSink {
    scheduler: Arc<dyn UiScheduler>,
    handler: UiEventHandler,
}

impl UiEventSink {
    pub fn new(scheduler: Arc<dyn UiScheduler>, handler: UiEventHandler) -> Self {
        Self { scheduler, handler }
    }

    fn forward(&self, event: UiEvent) {
        let handler = Arc::clone(&self.handler);
        self.scheduler.post(Box::new(move || handler(event)));
    }
}

impl SlicingEventSink for UiEventSink {
    fn on_slicing_update(&self, status: &SlicingStatus) {
        self.forward(UiEvent::SlicingUpdate(status.clone()));
    }

    fn on_slicing_completed(&self, timestamp: i32) {
        self.forward(UiEvent::SlicingCompleted { timestamp });
    }

    fn on_process_finished(&self, info: &SlicingCompletedInfo) {
        self.forward(UiEvent::ProcessFinished(info.clone()));
    }

    fn on_export_began(&self) {
        self.forward(UiEvent::ExportBegan);
    }

    fn on_export_finished(&self, path: &str) {
        self.forward(UiEvent::ExportFinished {
            path: path.to_string(),
        });
    }
}
