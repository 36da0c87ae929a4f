//! Cached slicing status served by `GET /api/status`.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};

use slicebridge_core::{CompletionStatus, SlicingCompletedInfo, SlicingEventSink, SlicingStatus};

#[derive(Debug, Default)]
struct CachedStatus {
    last_status: SlicingStatus,
    last_completed: SlicingCompletedInfo,
    has_completed: bool,
}

/// Last observed progress and completion, guarded by one mutex.
#[derive(Debug, Default)]
pub struct StatusCache {
    inner: Mutex<CachedStatus>,
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub percent: i32,
    pub message: String,
    pub flags: u32,
    pub warning_step: i32,
    /// Present when a run finished since the last start or reset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<CompletedSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedSnapshot {
    pub status: CompletionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_status(&self, status: &SlicingStatus) {
        self.inner.lock().last_status = status.clone();
    }

    pub fn update_completed(&self, info: &SlicingCompletedInfo) {
        let mut inner = self.inner.lock();
        inner.last_completed = info.clone();
        inner.has_completed = true;
    }

    /// Forget the completion, keeping the last progress.
    pub fn clear_completed(&self) {
        self.inner.lock().has_completed = false;
    }

    /// Forget progress and completion.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.last_status = SlicingStatus::default();
        inner.has_completed = false;
    }

    pub fn has_completed(&self) -> bool {
        self.inner.lock().has_completed
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.lock();
        let completed = inner.has_completed.then(|| CompletedSnapshot {
            status: inner.last_completed.status,
            error_message: inner
                .last_completed
                .error_message
                .clone()
                .filter(|m| !m.is_empty()),
        });
        StatusSnapshot {
            percent: inner.last_status.percent,
            message: inner.last_status.message.clone(),
            flags: inner.last_status.flags,
            warning_step: inner.last_status.warning_step,
            completed,
        }
    }
}

/// Sink that keeps a [`StatusCache`] current.
///
/// Holds the cache weakly; events arriving after the API is gone are ignored.
pub struct HttpEventSink {
    cache: Weak<StatusCache>,
}

impl HttpEventSink {
    pub fn new(cache: &Arc<StatusCache>) -> Self {
        Self {
            cache: Arc::downgrade(cache),
        }
    }
}

impl SlicingEventSink for HttpEventSink {
    fn on_slicing_update(&self, status: &SlicingStatus) {
        if let Some(cache) = self.cache.upgrade() {
            cache.update_status(status);
        }
    }

    fn on_slicing_completed(&self, _timestamp: i32) {}

    fn on_process_finished(&self, info: &SlicingCompletedInfo) {
        if let Some(cache) = self.cache.upgrade() {
            cache.update_completed(info);
        }
    }

    fn on_export_began(&self) {}

    fn on_export_finished(&self, _path: &str) {}
}
