//! # Config Change Bus Module
//!
//! Process-wide notification channel for configuration option changes.
//!
//! ## Overview
//!
//! Two kinds of subscribers are supported:
//! - Listener objects, held through `Weak` references so the bus never
//!   extends their lifetime. Expired listeners are swept on the next `notify`.
//! - Callbacks, owned by the bus until `clear()`.
//!
//! Delivery is synchronous on the caller's thread: listeners first, then
//! callbacks, each in registration order.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use slicebridge_core::{config_bus, OptionValue};
//! use std::sync::Arc;
//!
//! config_bus().add_callback(Arc::new(|key: &str, value: &OptionValue| {
//!     tracing::info!("{} changed to {:?}", key, value);
//! }));
//!
//! config_bus().notify("layer_height", &OptionValue::Float(0.2));
//! ```

mod bus;

pub use bus::*;
