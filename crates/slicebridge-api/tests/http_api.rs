use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use slicebridge_api::{HttpApiConfig, HttpSlicerApi, Studio, UiHooks};
use slicebridge_core::{
    PresetBundle, PresetKind, PresetStore, PresetsView, QueueUiScheduler, SlicingEventSink,
    SlicingProcess, SlicingStatus, UiQueue,
};
use slicebridge_mqtt::{MemoryTransport, MqttConfigPublisher};

const BUNDLE: &str = r##"{
    "printers": [
        {"name": "P0", "is_system": true, "config": {
            "nozzle_diameter": {"type": "floats", "value": [0.4, 0.4]},
            "printer_model": {"type": "string", "value": "Bench"}
        }},
        {"name": "P1", "config": {
            "nozzle_diameter": {"type": "floats", "value": [0.4, 0.6]},
            "retraction_length": {"type": "floats", "value": [0.8, 1.2]},
            "printer_model": {"type": "string", "value": "X1"},
            "printer_variant": {"type": "string", "value": "0.4"},
            "printable_height": {"type": "float", "value": 250.0}
        }},
        {"name": "Hidden", "is_visible": false}
    ],
    "filaments": [
        {"name": "PLA", "config": {
            "filament_type": {"type": "strings", "value": ["PLA"]},
            "filament_colour": {"type": "strings", "value": ["#FFFFFF"]}
        }},
        {"name": "PETG", "config": {
            "filament_type": {"type": "strings", "value": ["PETG"]},
            "nozzle_temperature": {"type": "ints", "value": [240]}
        }}
    ],
    "selected_printer": "P0"
}"##;

/// Process that accepts exactly what its flags allow.
#[derive(Default)]
struct MockProcess {
    running: AtomicBool,
    resets: AtomicUsize,
}

impl SlicingProcess for MockProcess {
    fn start(&self) -> bool {
        !self.running.swap(true, Ordering::SeqCst)
    }
    fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
    fn reset(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
    fn idle(&self) -> bool {
        !self.running()
    }
    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
    fn finished(&self) -> bool {
        false
    }
    fn empty(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct RecordingView {
    updates: Mutex<Vec<PresetKind>>,
    dirty: AtomicUsize,
}

impl PresetsView for RecordingView {
    fn update_presets(&self, kind: PresetKind) {
        self.updates.lock().push(kind);
    }
    fn mark_project_dirty(&self) {
        self.dirty.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    api: HttpSlicerApi,
    process: Arc<MockProcess>,
    store: Arc<Mutex<PresetBundle>>,
    transport: Arc<MemoryTransport>,
    view: Arc<RecordingView>,
    ui_queue: UiQueue,
}

fn harness() -> Harness {
    let bundle = PresetBundle::from_json_str(BUNDLE).unwrap();
    let store = Arc::new(Mutex::new(bundle));

    let publisher = MqttConfigPublisher::create_default().unwrap();
    let transport = Arc::new(MemoryTransport::new());
    publisher.attach_transport(transport.clone());

    let studio = Studio::with_publisher(publisher);
    studio.set_preset_store(Some(store.clone()));

    let (scheduler, ui_queue) = QueueUiScheduler::new();
    let view = Arc::new(RecordingView::default());
    let process = Arc::new(MockProcess::default());

    let api = HttpSlicerApi::new(HttpApiConfig::default(), Some(process.clone()))
        .with_studio(studio)
        .with_ui(UiHooks::new(Arc::new(scheduler), view.clone()));

    Harness {
        api,
        process,
        store,
        transport,
        view,
        ui_queue,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let h = harness();
    let (status, body) = send(&h.api.router(), Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_status_cache_after_reset() {
    let h = harness();
    let router = h.api.router();
    let sink = h.api.event_sink();

    sink.on_slicing_update(&SlicingStatus::new(50, "slicing"));
    let (_, body) = send(&router, Method::GET, "/api/status", None).await;
    assert_eq!(body["percent"], 50);
    assert_eq!(body["message"], "slicing");

    sink.on_process_finished(&slicebridge_core::SlicingCompletedInfo::cancelled());
    let (_, body) = send(&router, Method::GET, "/api/status", None).await;
    assert_eq!(body["completed"]["status"], "cancelled");

    let (status, body) = send(&router, Method::POST, "/api/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "reset" }));
    assert_eq!(h.process.resets.load(Ordering::SeqCst), 1);

    let (_, body) = send(&router, Method::GET, "/api/status", None).await;
    assert_eq!(body["percent"], 0);
    assert!(body.get("completed").is_none());
}

#[tokio::test]
async fn test_start_stop_and_state() {
    let h = harness();
    let router = h.api.router();

    h.api
        .update_completed(&slicebridge_core::SlicingCompletedInfo::finished());
    let (status, body) = send(&router, Method::POST, "/api/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");
    assert!(!h.api.status_cache().has_completed());

    let (status, body) = send(&router, Method::POST, "/api/start", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not start (already running or empty)");

    let (_, body) = send(&router, Method::GET, "/api/state", None).await;
    assert_eq!(
        body,
        json!({ "idle": false, "running": true, "finished": false, "empty": false })
    );

    let (status, _) = send(&router, Method::POST, "/api/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&router, Method::POST, "/api/stop", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not stop (not running)");
}

#[tokio::test]
async fn test_missing_collaborators() {
    let api = HttpSlicerApi::new(HttpApiConfig::default(), None);
    let router = api.router();

    let (status, body) = send(&router, Method::POST, "/api/start", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "No process configured");

    let (status, body) = send(&router, Method::GET, "/api/printers", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Studio not initialized");

    let studio = Studio::with_publisher(MqttConfigPublisher::create_default().unwrap());
    let api = HttpSlicerApi::new(HttpApiConfig::default(), None).with_studio(studio);
    let (status, body) = send(&api.router(), Method::GET, "/api/filaments", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "PresetBundle not available");
}

#[tokio::test]
async fn test_list_printers() {
    let h = harness();
    let (status, body) = send(&h.api.router(), Method::GET, "/api/printers", None).await;
    assert_eq!(status, StatusCode::OK);

    let printers = body["printers"].as_array().unwrap();
    assert_eq!(printers.len(), 2);
    assert_eq!(printers[0]["name"], "P0");
    assert_eq!(printers[0]["is_system"], true);
    assert_eq!(printers[0]["model"], "Bench");
    assert!(printers[0].get("variant").is_none());
    assert_eq!(printers[1]["variant"], "0.4");
    assert_eq!(body["selected"], "P0");
}

#[tokio::test]
async fn test_list_filaments() {
    let h = harness();
    let (_, body) = send(&h.api.router(), Method::GET, "/api/filaments", None).await;

    let filaments = body["filaments"].as_array().unwrap();
    assert_eq!(filaments[0]["type"], "PLA");
    assert_eq!(filaments[0]["color"], "#FFFFFF");
    assert!(filaments[1].get("color").is_none());
    assert_eq!(body["selected"], json!(["PLA", "PLA"]));
}

#[tokio::test]
async fn test_select_printer_publishes_snapshot() {
    let h = harness();
    let router = h.api.router();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/printers/select",
        Some(json!({ "name": "P1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "selected", "name": "P1" }));
    assert_eq!(h.store.lock().printers().get_selected_preset_name(), "P1");

    let topics = h.transport.topics();
    assert_eq!(topics[0], "slicer/config/presets/printer");
    let event: Value =
        serde_json::from_str(&h.transport.retained("slicer/config/presets/printer").unwrap())
            .unwrap();
    assert_eq!(
        event,
        json!({ "event": "printer_changed", "previous": "P0", "current": "P1" })
    );

    assert!(topics.iter().all(|t| t.starts_with("slicer/config/")));
    assert!(h
        .transport
        .retained("slicer/config/printer/extruder/1/retraction/retraction_length")
        .is_some());
    assert!(h
        .transport
        .retained("slicer/config/printer/misc/printer_variant")
        .is_some());

    assert!(h.view.updates.lock().is_empty());
    assert_eq!(h.ui_queue.run_pending(), 1);
    assert_eq!(
        *h.view.updates.lock(),
        vec![PresetKind::Printer, PresetKind::Filament, PresetKind::Print]
    );
    assert_eq!(h.view.dirty.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_select_printer_errors() {
    let h = harness();
    let router = h.api.router();

    let (status, body) = send(&router, Method::POST, "/api/printers/select", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing or invalid 'name' field in request body");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/printers/select",
        Some(json!({ "name": "Nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Printer preset not found", "name": "Nope" }));

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/printers/select",
        Some(json!({ "name": "Hidden" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not select printer preset");
    assert!(h.transport.is_empty());
}

#[tokio::test]
async fn test_malformed_body() {
    let h = harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/printers/select")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = h.api.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Malformed JSON body"));
}

#[tokio::test]
async fn test_select_filament() {
    let h = harness();
    let router = h.api.router();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/filaments/select",
        Some(json!({ "name": "PETG", "extruder": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "selected", "name": "PETG", "extruder": 1 })
    );
    assert_eq!(h.store.lock().filament_presets(), &["PLA", "PETG"]);

    let event: Value =
        serde_json::from_str(&h.transport.retained("slicer/config/presets/filament").unwrap())
            .unwrap();
    assert_eq!(
        event,
        json!({ "event": "filament_changed", "extruder": 1, "previous": "PLA", "current": "PETG" })
    );
    assert!(h
        .transport
        .retained("slicer/config/filament/1/nozzle_temperature")
        .is_some());

    h.ui_queue.run_pending();
    assert_eq!(*h.view.updates.lock(), vec![PresetKind::Filament]);
}

#[tokio::test]
async fn test_select_filament_defaults_to_first_extruder() {
    let h = harness();
    let (_, body) = send(
        &h.api.router(),
        Method::POST,
        "/api/filaments/select",
        Some(json!({ "name": "PETG" })),
    )
    .await;
    assert_eq!(body["extruder"], 0);
    assert_eq!(h.store.lock().filament_presets()[0], "PETG");
}

#[tokio::test]
async fn test_select_filament_invalid_extruder() {
    let h = harness();
    let router = h.api.router();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/filaments/select",
        Some(json!({ "name": "Missing", "extruder": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "Invalid extruder index", "extruder": 2, "max_extruders": 2 })
    );

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/filaments/select",
        Some(json!({ "name": "Missing", "extruder": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Filament preset not found");
}

#[tokio::test]
async fn test_preflight_and_cors() {
    let h = harness();
    let router = h.api.router();

    for uri in ["/api/printers/select", "/api/anything"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    let api = HttpSlicerApi::new(
        HttpApiConfig {
            enable_cors: false,
            ..HttpApiConfig::default()
        },
        None,
    );
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let response = api.router().oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[test]
fn test_server_lifecycle() {
    let api = HttpSlicerApi::new(
        HttpApiConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            enable_cors: true,
        },
        None,
    );
    assert!(!api.is_running());

    api.start().unwrap();
    assert!(api.is_running());
    assert_ne!(api.port(), 0);
    api.start().unwrap();

    api.stop();
    assert!(!api.is_running());
    assert_eq!(api.port(), 0);
}
