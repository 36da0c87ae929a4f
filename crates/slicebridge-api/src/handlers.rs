//! Request handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use slicebridge_core::{CompatibleSelect, Preset, PresetKind, ProcessState};

use crate::error::{ApiError, ApiResult};
use crate::server::ApiState;
use crate::status::StatusSnapshot;

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn status(State(state): State<ApiState>) -> Json<StatusSnapshot> {
    Json(state.status.snapshot())
}

pub(crate) async fn process_state(State(state): State<ApiState>) -> ApiResult<Json<ProcessState>> {
    Ok(Json(state.process()?.state()))
}

pub(crate) async fn start(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    if !state.process()?.start() {
        return Err(ApiError::StartRefused);
    }
    state.status.clear_completed();
    tracing::info!("Slicing started via HTTP API");
    Ok(Json(json!({ "status": "started" })))
}

pub(crate) async fn stop(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    if !state.process()?.stop() {
        return Err(ApiError::StopRefused);
    }
    tracing::info!("Slicing stopped via HTTP API");
    Ok(Json(json!({ "status": "stopped" })))
}

pub(crate) async fn reset(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    state.process()?.reset();
    state.status.reset();
    Ok(Json(json!({ "status": "reset" })))
}

fn preset_entry(preset: &Preset) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert("name".to_string(), json!(preset.name));
    entry.insert("is_system".to_string(), json!(preset.is_system));
    entry.insert("is_default".to_string(), json!(preset.is_default));
    entry.insert("is_external".to_string(), json!(preset.is_external));
    entry.insert("is_visible".to_string(), json!(preset.is_visible));
    entry.insert("is_compatible".to_string(), json!(preset.is_compatible));
    entry
}

fn add_string(entry: &mut Map<String, Value>, field: &str, preset: &Preset, key: &str) {
    if let Some(value) = preset.first_string(key) {
        entry.insert(field.to_string(), json!(value));
    }
}

pub(crate) async fn list_printers(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let store = state.preset_store()?;
    let store = store.lock();
    let printers = store.printers();

    let entries: Vec<Value> = printers
        .get_presets()
        .iter()
        .filter(|p| p.is_visible)
        .map(|preset| {
            let mut entry = preset_entry(preset);
            add_string(&mut entry, "model", preset, "printer_model");
            add_string(&mut entry, "variant", preset, "printer_variant");
            Value::Object(entry)
        })
        .collect();

    Ok(Json(json!({
        "printers": entries,
        "selected": printers.get_selected_preset_name(),
    })))
}

pub(crate) async fn list_filaments(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let store = state.preset_store()?;
    let store = store.lock();

    let entries: Vec<Value> = store
        .filaments()
        .get_presets()
        .iter()
        .filter(|p| p.is_visible)
        .map(|preset| {
            let mut entry = preset_entry(preset);
            add_string(&mut entry, "type", preset, "filament_type");
            add_string(&mut entry, "color", preset, "filament_colour");
            Value::Object(entry)
        })
        .collect();

    Ok(Json(json!({
        "filaments": entries,
        "selected": store.filament_presets(),
    })))
}

fn parse_body(body: &Bytes) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| ApiError::MalformedBody(e.to_string()))
}

fn name_field(body: &Value) -> ApiResult<String> {
    body.get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingName)
}

fn extruder_field(body: &Value) -> ApiResult<i64> {
    match body.get("extruder") {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_i64().ok_or(ApiError::MalformedExtruder),
    }
}

pub(crate) async fn select_printer(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let studio = state.studio()?;
    let store = state.preset_store()?;
    let name = name_field(&parse_body(&body)?)?;

    let (previous, config) = {
        let mut store = store.lock();
        let config = store
            .printers()
            .find_preset(&name, false)
            .map(|p| p.config.clone())
            .ok_or_else(|| ApiError::PrinterNotFound { name: name.clone() })?;
        let previous = store.printers().get_selected_preset_name().to_string();

        if !store.printers_mut().select_preset_by_name(&name, false) {
            return Err(ApiError::PrinterSelectRefused { name });
        }
        store.update_compatible(CompatibleSelect::Always, CompatibleSelect::Always);
        (previous, config)
    };

    tracing::info!("Printer preset '{}' selected via HTTP API", name);
    state.refresh_ui(&[PresetKind::Printer, PresetKind::Filament, PresetKind::Print]);

    if let Some(mqtt) = studio.mqtt_publisher().filter(|m| m.is_connected()) {
        mqtt.publish_printer_changed(&previous, &name);
        mqtt.publish_printer_config(&config, &name);
    }

    Ok(Json(json!({ "status": "selected", "name": name })))
}

pub(crate) async fn select_filament(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let studio = state.studio()?;
    let store = state.preset_store()?;
    let body = parse_body(&body)?;
    let name = name_field(&body)?;
    let extruder = extruder_field(&body)?;

    let (idx, previous, config) = {
        let mut store = store.lock();
        let max_extruders = store.filament_presets().len();
        let idx = usize::try_from(extruder)
            .ok()
            .filter(|idx| *idx < max_extruders)
            .ok_or(ApiError::InvalidExtruder {
                extruder,
                max_extruders,
            })?;

        let config = store
            .filaments()
            .find_preset(&name, false)
            .map(|p| p.config.clone())
            .ok_or_else(|| ApiError::FilamentNotFound { name: name.clone() })?;
        let previous = store.filament_presets()[idx].clone();

        store.set_filament_preset(idx, &name);
        store.filaments_mut().select_preset_by_name(&name, false);
        (idx, previous, config)
    };

    tracing::info!(
        "Filament preset '{}' selected for extruder {} via HTTP API",
        name,
        idx
    );
    state.refresh_ui(&[PresetKind::Filament]);

    if let Some(mqtt) = studio.mqtt_publisher().filter(|m| m.is_connected()) {
        mqtt.publish_filament_changed(idx, &previous, &name);
        mqtt.publish_filament_config(&config, &name, idx);
    }

    Ok(Json(json!({
        "status": "selected",
        "name": name,
        "extruder": idx,
    })))
}

pub(crate) async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub(crate) async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
