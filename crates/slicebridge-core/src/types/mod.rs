//! Common type aliases for SliceBridge.
//!
//! Provides a readable name for the shared, lock-protected state the bridge
//! hands to its subsystems.

pub mod aliases;

pub use aliases::*;
