//! Headless slicing process.
//!
//! [`SimulatedProcess`] stands in for a slicing engine: `start()` runs a
//! background worker that reports progress, completes slicing, exports a
//! file and reports the outcome through an event sink (normally the
//! dispatcher). It lets the bridge be exercised end to end without an
//! engine attached.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use slicebridge_core::{SlicingCompletedInfo, SlicingEventSinkRef, SlicingProcess, SlicingStatus};

/// Shape of a simulated run.
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Number of progress updates before slicing completes
    pub steps: u32,
    /// Pause between updates
    pub step_delay: Duration,
    /// Path reported by the export
    pub output_path: String,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            steps: 20,
            step_delay: Duration::from_millis(100),
            output_path: "plate_1.gcode".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Finished,
}

struct Shared {
    phase: Mutex<Phase>,
    cancel: AtomicBool,
    empty: AtomicBool,
    runs: AtomicI32,
}

/// Slicing process driven by a timer instead of an engine.
pub struct SimulatedProcess {
    sink: SlicingEventSinkRef,
    options: SimulationOptions,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedProcess {
    pub fn new(sink: SlicingEventSinkRef, options: SimulationOptions) -> Self {
        Self {
            sink,
            options,
            shared: Arc::new(Shared {
                phase: Mutex::new(Phase::Idle),
                cancel: AtomicBool::new(false),
                empty: AtomicBool::new(false),
                runs: AtomicI32::new(0),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Mark the plate as having nothing to slice.
    pub fn set_empty(&self, empty: bool) {
        self.shared.empty.store(empty, Ordering::SeqCst);
    }

    fn phase(&self) -> Phase {
        *self.shared.phase.lock()
    }

    fn join_worker(&self) {
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("Slicing worker panicked");
            }
        }
    }
}

fn run_worker(sink: SlicingEventSinkRef, options: SimulationOptions, shared: Arc<Shared>) {
    let steps = options.steps.max(1);
    for step in 1..=steps {
        std::thread::sleep(options.step_delay);
        if shared.cancel.load(Ordering::SeqCst) {
            *shared.phase.lock() = Phase::Idle;
            tracing::info!("Slicing cancelled at step {}/{}", step, steps);
            sink.on_process_finished(&SlicingCompletedInfo::cancelled());
            return;
        }
        let percent = (step * 90 / steps) as i32;
        sink.on_slicing_update(&SlicingStatus::new(
            percent,
            format!("Slicing layer {}/{}", step, steps),
        ));
    }

    let timestamp = shared.runs.fetch_add(1, Ordering::SeqCst) + 1;
    sink.on_slicing_completed(timestamp);

    sink.on_export_began();
    sink.on_slicing_update(&SlicingStatus::new(95, "Exporting G-code"));
    std::thread::sleep(options.step_delay);
    sink.on_export_finished(&options.output_path);
    sink.on_slicing_update(&SlicingStatus::new(100, "Done"));

    *shared.phase.lock() = Phase::Finished;
    sink.on_process_finished(&SlicingCompletedInfo::finished());
}

impl SlicingProcess for SimulatedProcess {
    fn start(&self) -> bool {
        if self.empty() {
            return false;
        }
        {
            let mut phase = self.shared.phase.lock();
            if *phase == Phase::Running {
                return false;
            }
            *phase = Phase::Running;
        }
        self.join_worker();
        self.shared.cancel.store(false, Ordering::SeqCst);

        let sink = self.sink.clone();
        let options = self.options.clone();
        let shared = self.shared.clone();
        match std::thread::Builder::new()
            .name("slicing-worker".to_string())
            .spawn(move || run_worker(sink, options, shared))
        {
            Ok(worker) => {
                *self.worker.lock() = Some(worker);
                true
            }
            Err(e) => {
                tracing::error!("Could not spawn slicing worker: {}", e);
                *self.shared.phase.lock() = Phase::Idle;
                false
            }
        }
    }

    fn stop(&self) -> bool {
        if self.phase() != Phase::Running {
            return false;
        }
        self.shared.cancel.store(true, Ordering::SeqCst);
        true
    }

    fn reset(&self) {
        self.shared.cancel.store(true, Ordering::SeqCst);
        self.join_worker();
        *self.shared.phase.lock() = Phase::Idle;
    }

    fn idle(&self) -> bool {
        self.phase() == Phase::Idle
    }

    fn running(&self) -> bool {
        self.phase() == Phase::Running
    }

    fn finished(&self) -> bool {
        self.phase() == Phase::Finished
    }

    fn empty(&self) -> bool {
        self.shared.empty.load(Ordering::SeqCst)
    }
}

impl Drop for SimulatedProcess {
    fn drop(&mut self) {
        self.shared.cancel.store(true, Ordering::SeqCst);
        self.join_worker();
    }
}
