//! Error responses of the HTTP API.
//!
//! Every error renders as a JSON object with an `error` message, plus the
//! offending `name` or extruder index where one applies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Failure of an API request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Studio not initialized")]
    StudioNotInitialized,

    #[error("PresetBundle not available")]
    PresetStoreUnavailable,

    #[error("No process configured")]
    NoProcess,

    /// The body is not a JSON object
    #[error("Malformed JSON body: {0}")]
    MalformedBody(String),

    #[error("Missing or invalid 'name' field in request body")]
    MissingName,

    #[error("Invalid 'extruder' field in request body")]
    MalformedExtruder,

    #[error("Printer preset not found")]
    PrinterNotFound { name: String },

    #[error("Filament preset not found")]
    FilamentNotFound { name: String },

    #[error("Could not select printer preset")]
    PrinterSelectRefused { name: String },

    #[error("Invalid extruder index")]
    InvalidExtruder { extruder: i64, max_extruders: usize },

    #[error("Could not start (already running or empty)")]
    StartRefused,

    #[error("Could not stop (not running)")]
    StopRefused,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::StudioNotInitialized | Self::PresetStoreUnavailable | Self::NoProcess => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::PrinterNotFound { .. } | Self::FilamentNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// JSON body of the error response.
    pub fn to_json(&self) -> Value {
        let mut body = json!({ "error": self.to_string() });
        match self {
            Self::PrinterNotFound { name }
            | Self::FilamentNotFound { name }
            | Self::PrinterSelectRefused { name } => {
                body["name"] = json!(name);
            }
            Self::InvalidExtruder {
                extruder,
                max_extruders,
            } => {
                body["extruder"] = json!(extruder);
                body["max_extruders"] = json!(max_extruders);
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("HTTP API request failed: {}", self);
        } else {
            tracing::debug!("HTTP API request rejected: {}", self);
        }
        (status, Json(self.to_json())).into_response()
    }
}

/// Result type of API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
