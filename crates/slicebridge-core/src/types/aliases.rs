//! Type aliases for shared mutable state.
//!
//! Shared state in SliceBridge crosses threads (the slicing worker, the
//! HTTP server thread, the MQTT network loop and the UI loop), so the alias
//! is the thread-safe one.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use slicebridge_core::types::*;
//!
//! // Instead of: Arc<Mutex<PresetBundle>>
//! let store: ThreadSafe<PresetBundle> = thread_safe(PresetBundle::new());
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex`, which does not poison when a holder panics.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}
