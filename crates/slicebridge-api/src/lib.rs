//! # SliceBridge API
//!
//! The HTTP control façade and the application services it works against.
//!
//! - [`Studio`]: application services context (preset store slot and the
//!   MQTT config publisher)
//! - [`HttpSlicerApi`]: REST server on its own thread
//! - [`HttpEventSink`]: slicing event sink feeding `GET /api/status`

pub mod error;
pub mod server;
pub mod status;
pub mod studio;

mod handlers;

pub use error::{ApiError, ApiResult};
pub use server::{HttpApiConfig, HttpSlicerApi, UiHooks};
pub use status::{HttpEventSink, StatusCache, StatusSnapshot};
pub use studio::Studio;
