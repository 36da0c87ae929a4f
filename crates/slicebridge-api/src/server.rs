//! HTTP control server.
//!
//! The axum router runs on a dedicated `http-api` thread that owns its own
//! tokio runtime, so the host application needs no async runtime of its
//! own. `start()` binds and spawns; `stop()` triggers a graceful shutdown
//! and joins the thread.

use axum::http::{header, HeaderValue};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;

use slicebridge_core::{
    PresetKind, PresetsView, SharedPresetStore, SlicingCompletedInfo, SlicingProcessRef,
    SlicingStatus, UiScheduler,
};

use crate::error::{ApiError, ApiResult};
use crate::handlers;
use crate::status::{HttpEventSink, StatusCache};
use crate::studio::Studio;

/// Listen address and CORS switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpApiConfig {
    pub bind_address: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// UI loop access for refreshes after a preset selection.
#[derive(Clone)]
pub struct UiHooks {
    scheduler: Arc<dyn UiScheduler>,
    view: Arc<dyn PresetsView>,
}

impl UiHooks {
    pub fn new(scheduler: Arc<dyn UiScheduler>, view: Arc<dyn PresetsView>) -> Self {
        Self { scheduler, view }
    }

    /// Post a refresh of the given selectors; the project is marked dirty.
    pub(crate) fn refresh(&self, kinds: &'static [PresetKind]) {
        let view = self.view.clone();
        self.scheduler.post(Box::new(move || {
            for kind in kinds {
                view.update_presets(*kind);
            }
            view.mark_project_dirty();
        }));
    }
}

/// Shared state of the request handlers.
#[derive(Clone)]
pub(crate) struct ApiState {
    pub(crate) studio: Option<Arc<Studio>>,
    pub(crate) process: Option<SlicingProcessRef>,
    pub(crate) status: Arc<StatusCache>,
    pub(crate) ui: Option<UiHooks>,
}

impl ApiState {
    pub(crate) fn process(&self) -> ApiResult<&SlicingProcessRef> {
        self.process.as_ref().ok_or(ApiError::NoProcess)
    }

    pub(crate) fn studio(&self) -> ApiResult<&Arc<Studio>> {
        self.studio.as_ref().ok_or(ApiError::StudioNotInitialized)
    }

    pub(crate) fn preset_store(&self) -> ApiResult<SharedPresetStore> {
        self.studio()?
            .preset_store()
            .ok_or(ApiError::PresetStoreUnavailable)
    }

    pub(crate) fn refresh_ui(&self, kinds: &'static [PresetKind]) {
        match &self.ui {
            Some(ui) => ui.refresh(kinds),
            None => tracing::debug!("No UI attached, skipping preset refresh"),
        }
    }
}

struct ServerHandle {
    shutdown: oneshot::Sender<()>,
    thread: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// REST API for controlling the slicer.
///
/// | Method + path | Purpose |
/// |---|---|
/// | `GET /api/health` | liveness |
/// | `GET /api/status` | cached progress and completion |
/// | `GET /api/state` | live process state |
/// | `POST /api/start`, `/api/stop`, `/api/reset` | process control |
/// | `GET /api/printers`, `POST /api/printers/select` | printer presets |
/// | `GET /api/filaments`, `POST /api/filaments/select` | filament presets |
pub struct HttpSlicerApi {
    config: HttpApiConfig,
    state: ApiState,
    running: Arc<AtomicBool>,
    server: Mutex<Option<ServerHandle>>,
}

impl HttpSlicerApi {
    pub fn new(config: HttpApiConfig, process: Option<SlicingProcessRef>) -> Self {
        Self {
            config,
            state: ApiState {
                studio: None,
                process,
                status: Arc::new(StatusCache::new()),
                ui: None,
            },
            running: Arc::new(AtomicBool::new(false)),
            server: Mutex::new(None),
        }
    }

    pub fn with_studio(mut self, studio: Arc<Studio>) -> Self {
        self.state.studio = Some(studio);
        self
    }

    pub fn with_ui(mut self, ui: UiHooks) -> Self {
        self.state.ui = Some(ui);
        self
    }

    pub fn config(&self) -> &HttpApiConfig {
        &self.config
    }

    pub fn status_cache(&self) -> &Arc<StatusCache> {
        &self.state.status
    }

    /// Sink to install on the slicing dispatcher.
    pub fn event_sink(&self) -> HttpEventSink {
        HttpEventSink::new(&self.state.status)
    }

    pub fn update_status(&self, status: &SlicingStatus) {
        self.state.status.update_status(status);
    }

    pub fn update_completed(&self, info: &SlicingCompletedInfo) {
        self.state.status.update_completed(info);
    }

    /// The request router, with CORS headers when enabled.
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route(
                "/api/health",
                get(handlers::health).options(handlers::preflight),
            )
            .route(
                "/api/status",
                get(handlers::status).options(handlers::preflight),
            )
            .route(
                "/api/state",
                get(handlers::process_state).options(handlers::preflight),
            )
            .route(
                "/api/start",
                post(handlers::start).options(handlers::preflight),
            )
            .route("/api/stop", post(handlers::stop).options(handlers::preflight))
            .route(
                "/api/reset",
                post(handlers::reset).options(handlers::preflight),
            )
            .route(
                "/api/printers",
                get(handlers::list_printers).options(handlers::preflight),
            )
            .route(
                "/api/printers/select",
                post(handlers::select_printer).options(handlers::preflight),
            )
            .route(
                "/api/filaments",
                get(handlers::list_filaments).options(handlers::preflight),
            )
            .route(
                "/api/filaments/select",
                post(handlers::select_filament).options(handlers::preflight),
            )
            .fallback(handlers::fallback)
            .with_state(self.state.clone());

        if self.config.enable_cors {
            router.layer(middleware::map_response(add_cors_headers))
        } else {
            router
        }
    }

    /// Bind and start serving on the `http-api` thread.
    ///
    /// Bind failures are returned to the caller. Starting a running server
    /// is a no-op.
    pub fn start(&self) -> std::io::Result<()> {
        let mut server = self.server.lock();
        if self.is_running() {
            return Ok(());
        }
        if let Some(stale) = server.take() {
            if stale.thread.join().is_err() {
                tracing::error!("HTTP API server thread panicked");
            }
        }

        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = std::net::TcpListener::bind(&addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("http-api-worker")
            .enable_all()
            .build()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = self.router();
        let running = self.running.clone();

        running.store(true, Ordering::SeqCst);
        let spawned = std::thread::Builder::new()
            .name("http-api".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(listener) => listener,
                        Err(e) => {
                            tracing::error!("HTTP API listener setup failed: {}", e);
                            return;
                        }
                    };
                    let shutdown = async {
                        let _ = shutdown_rx.await;
                    };
                    if let Err(e) = axum::serve(listener, router)
                        .with_graceful_shutdown(shutdown)
                        .await
                    {
                        tracing::error!("HTTP API server failed: {}", e);
                    }
                });
                running.store(false, Ordering::SeqCst);
                tracing::info!("HTTP API server stopped");
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        tracing::info!("HTTP API listening on {}", local_addr);
        *server = Some(ServerHandle {
            shutdown: shutdown_tx,
            thread,
            local_addr,
        });
        Ok(())
    }

    /// Shut the server down and wait for its thread.
    pub fn stop(&self) {
        let handle = self.server.lock().take();
        if let Some(handle) = handle {
            let _ = handle.shutdown.send(());
            if handle.thread.join().is_err() {
                tracing::error!("HTTP API server thread panicked");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bound address while serving.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().as_ref().map(|h| h.local_addr)
    }

    /// Port being served, or the configured port when stopped.
    pub fn port(&self) -> u16 {
        self.local_addr()
            .map(|addr| addr.port())
            .unwrap_or(self.config.port)
    }
}

impl Drop for HttpSlicerApi {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn add_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}
