//! Config change bus implementation.
//!
//! Provides the `ConfigChangeBus` struct and its global instance.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use crate::dispatcher::panic_message;
use crate::options::OptionValue;

/// Receiver of configuration option changes.
pub trait ConfigChangeListener: Send + Sync {
    /// Called once per `notify` while the listener is alive.
    fn on_config_change(&self, opt_key: &str, value: &OptionValue);
}

/// Callback subscriber owned by the bus.
pub type ConfigCallback = Arc<dyn Fn(&str, &OptionValue) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    listeners: Vec<Weak<dyn ConfigChangeListener>>,
    callbacks: Vec<ConfigCallback>,
}

/// Notification channel for `(opt_key, value)` changes.
///
/// Subscriber lists are guarded by a mutex that is released before any
/// subscriber runs. A subscriber may therefore call `notify` again from
/// inside its handler; the nested notification is delivered immediately on
/// the same thread, before the outer notification continues. Nothing is
/// queued.
pub struct ConfigChangeBus {
    subscribers: Mutex<Subscribers>,
    enabled: AtomicBool,
}

impl ConfigChangeBus {
    /// Create an enabled bus with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Subscribers::default()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Register a listener without taking ownership of it.
    ///
    /// Never scans the list; dead entries are removed by `notify`.
    pub fn add_listener(&self, listener: Weak<dyn ConfigChangeListener>) {
        self.subscribers.lock().listeners.push(listener);
        tracing::debug!("Config listener registered");
    }

    /// Register a callback. The bus keeps it until `clear()`.
    pub fn add_callback(&self, callback: ConfigCallback) {
        self.subscribers.lock().callbacks.push(callback);
        tracing::debug!("Config callback registered");
    }

    /// Deliver a change to every live listener, then to every callback.
    ///
    /// Does nothing while the bus is disabled.
    pub fn notify(&self, opt_key: &str, value: &OptionValue) {
        if !self.is_enabled() {
            return;
        }

        let (listeners, callbacks) = {
            let mut subs = self.subscribers.lock();
            let mut alive = Vec::with_capacity(subs.listeners.len());
            let before = subs.listeners.len();
            subs.listeners.retain(|weak| match weak.upgrade() {
                Some(listener) => {
                    alive.push(listener);
                    true
                }
                None => false,
            });
            let swept = before - subs.listeners.len();
            if swept > 0 {
                tracing::debug!("Swept {} expired config listener(s)", swept);
            }
            (alive, subs.callbacks.clone())
        };

        for listener in &listeners {
            let result = catch_unwind(AssertUnwindSafe(|| {
                listener.on_config_change(opt_key, value)
            }));
            if let Err(panic) = result {
                tracing::error!(
                    "Config listener panicked on '{}': {}",
                    opt_key,
                    panic_message(panic.as_ref())
                );
            }
        }

        for callback in &callbacks {
            let result = catch_unwind(AssertUnwindSafe(|| callback(opt_key, value)));
            if let Err(panic) = result {
                tracing::error!(
                    "Config callback panicked on '{}': {}",
                    opt_key,
                    panic_message(panic.as_ref())
                );
            }
        }
    }

    /// Drop all listeners and callbacks.
    pub fn clear(&self) {
        let mut subs = self.subscribers.lock();
        subs.listeners.clear();
        subs.callbacks.clear();
    }

    /// Enable or disable delivery.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether `notify` currently delivers.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Registered listener entries, including expired ones not yet swept.
    pub fn listener_count(&self) -> usize {
        self.subscribers.lock().listeners.len()
    }

    /// Registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.subscribers.lock().callbacks.len()
    }
}

impl Default for ConfigChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigChangeBus")
            .field("listeners", &self.listener_count())
            .field("callbacks", &self.callback_count())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Global config change bus instance
static CONFIG_BUS: OnceLock<ConfigChangeBus> = OnceLock::new();

/// Get or initialize the global config change bus
pub fn config_bus() -> &'static ConfigChangeBus {
    CONFIG_BUS.get_or_init(ConfigChangeBus::new)
}
