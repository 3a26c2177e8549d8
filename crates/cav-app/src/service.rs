//! Background stepping worker and foreground control surface.

use crate::compile::{Runtime, compile_config};
use crate::error::{AppError, AppResult};
use crate::playback::PlaybackController;
use cav_config::SimConfig;
use cav_history::{HistorySnapshot, HistoryStore, Sample};
use cav_session::{SessionData, SessionMeta};
use cav_sim::{
    ControlParameters, DriverState, ScanRequest, ScanResult, SimEngine, run_scan,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sleep while neither stepping nor playing back; keeps the idle worker off
/// the CPU without delaying command pickup noticeably.
const IDLE_PACE: Duration = Duration::from_millis(1);

/// Session file encodings supported by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFormat {
    Json,
    Csv,
}

#[derive(Debug, Default)]
struct ScanState {
    running: bool,
    result: Option<ScanResult>,
    error: Option<String>,
}

/// Shared state between the worker and the control surface.
///
/// The worker owns the engine (and with it the cavity state) exclusively;
/// everything here is read-modify-write under a mutex or an atomic flag.
struct Shared {
    params: Mutex<ControlParameters>,
    history: Mutex<HistoryStore<ControlParameters>>,
    playback: Mutex<PlaybackController>,
    scan: Mutex<ScanState>,
    last_error: Mutex<Option<String>>,
    sim_time: Mutex<f64>,
    running: AtomicBool,
    recording: AtomicBool,
    reset_requested: AtomicBool,
    shutdown: AtomicBool,
}

/// Point-in-time view of the service for status displays.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub driver_state: DriverState,
    pub sim_time: f64,
    pub samples: usize,
    pub recording: bool,
    pub playback_active: bool,
    pub playback_index: usize,
    pub last_error: Option<String>,
    pub scan_running: bool,
    pub scan_error: Option<String>,
}

/// The simulation service: spawns the stepping worker and provides the
/// foreground control surface.
pub struct SimulatorService {
    shared: Arc<Shared>,
    runtime: Runtime,
    worker: Option<JoinHandle<()>>,
    scan_worker: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatorService {
    /// Build the engine and start the background worker.
    ///
    /// Initialization failures (bad config, mechanical model construction,
    /// discretization) are fatal here and nothing is spawned.
    pub fn spawn(config: &SimConfig) -> AppResult<Self> {
        let runtime = compile_config(config)?;
        let engine = SimEngine::new(runtime.engine_params, &runtime.modes)?;
        let history = HistoryStore::new(runtime.modes.len(), runtime.history_capacity)?;

        let shared = Arc::new(Shared {
            params: Mutex::new(ControlParameters::default()),
            history: Mutex::new(history),
            playback: Mutex::new(PlaybackController::new()),
            scan: Mutex::new(ScanState::default()),
            last_error: Mutex::new(None),
            sim_time: Mutex::new(0.0),
            running: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            reset_requested: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });

        let pace = Duration::from_secs_f64(runtime.engine_params.dt * runtime.slowdown);
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("cav-sim-worker".to_string())
            .spawn(move || worker_loop(engine, worker_shared, pace))?;

        info!(
            modes = runtime.modes.len(),
            capacity = runtime.history_capacity,
            "simulator service spawned"
        );
        Ok(Self {
            shared,
            runtime,
            worker: Some(worker),
            scan_worker: Mutex::new(None),
        })
    }

    // --- run state -------------------------------------------------------

    pub fn start(&self) {
        self.shared.running.store(true, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
    }

    /// Request a reset: the worker stops, zeroes the cavity state and
    /// simulated time, and clears the history. Control parameters are
    /// preserved.
    pub fn reset(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
        self.shared.reset_requested.store(true, Ordering::Relaxed);
    }

    /// Stop the worker and any scan in progress, then join them.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        let scan_handle = self.scan_worker.lock().expect("scan lock poisoned").take();
        if let Some(handle) = scan_handle {
            let _ = handle.join();
        }
    }

    // --- parameters ------------------------------------------------------

    pub fn params(&self) -> ControlParameters {
        self.shared.params.lock().expect("params lock poisoned").clone()
    }

    pub fn set_params(&self, params: ControlParameters) -> AppResult<()> {
        params.validate()?;
        *self.shared.params.lock().expect("params lock poisoned") = params;
        Ok(())
    }

    // --- recording -------------------------------------------------------

    pub fn set_recording(&self, on: bool) {
        self.shared.recording.store(on, Ordering::Relaxed);
        debug!(recording = on, "recording toggled");
    }

    pub fn is_recording(&self) -> bool {
        self.shared.recording.load(Ordering::Relaxed)
    }

    // --- playback --------------------------------------------------------

    pub fn start_playback(&self) -> AppResult<()> {
        let len = self.shared.history.lock().expect("history lock poisoned").len();
        if len == 0 {
            return Err(AppError::InvalidInput(
                "no recorded data to play back".to_string(),
            ));
        }
        self.shared
            .playback
            .lock()
            .expect("playback lock poisoned")
            .start();
        Ok(())
    }

    pub fn stop_playback(&self) {
        self.shared
            .playback
            .lock()
            .expect("playback lock poisoned")
            .stop();
    }

    pub fn seek(&self, index: usize) {
        let len = self.shared.history.lock().expect("history lock poisoned").len();
        self.shared
            .playback
            .lock()
            .expect("playback lock poisoned")
            .seek(index, len);
    }

    /// Sample under the playback cursor, if playback is active.
    pub fn playback_sample(&self) -> Option<Sample> {
        let playback = self.shared.playback.lock().expect("playback lock poisoned");
        if !playback.is_active() {
            return None;
        }
        let index = playback.index();
        drop(playback);
        self.shared
            .history
            .lock()
            .expect("history lock poisoned")
            .sample_at(index)
    }

    // --- scanning --------------------------------------------------------

    /// Launch a parameter scan on its own worker against a disposable
    /// engine. The live loop and cavity state are untouched.
    pub fn start_scan(&self, request: ScanRequest) -> AppResult<()> {
        if !(request.min < request.max) {
            return Err(AppError::Scan(format!(
                "Invalid scan range: min {} must be less than max {}",
                request.min, request.max
            )));
        }
        {
            let mut scan = self.shared.scan.lock().expect("scan state lock poisoned");
            if scan.running {
                return Err(AppError::InvalidInput(
                    "a scan is already in progress".to_string(),
                ));
            }
            scan.running = true;
            scan.result = None;
            scan.error = None;
        }

        let engine_params = self.runtime.engine_params;
        let modes = self.runtime.modes.clone();
        let base = self.params();
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("cav-scan-worker".to_string())
            .spawn(move || {
                let outcome = run_scan(engine_params, &modes, &base, &request);
                let mut scan = shared.scan.lock().expect("scan state lock poisoned");
                scan.running = false;
                match outcome {
                    Ok(result) => scan.result = Some(result),
                    Err(e) => {
                        warn!(error = %e, "scan failed");
                        scan.error = Some(e.to_string());
                    }
                }
            })?;

        // join a previously finished scan before tracking the new one
        let mut slot = self.scan_worker.lock().expect("scan lock poisoned");
        if let Some(old) = slot.replace(handle) {
            let _ = old.join();
        }
        Ok(())
    }

    /// Latest completed scan result, if any.
    pub fn scan_result(&self) -> Option<ScanResult> {
        self.shared
            .scan
            .lock()
            .expect("scan state lock poisoned")
            .result
            .clone()
    }

    // --- history and sessions -------------------------------------------

    pub fn history_snapshot(&self) -> HistorySnapshot<ControlParameters> {
        self.shared
            .history
            .lock()
            .expect("history lock poisoned")
            .snapshot()
    }

    fn session_meta(&self) -> SessionMeta {
        let p = &self.runtime.engine_params;
        SessionMeta::now(p.dt, p.f0_hz, p.ql, p.roq, p.beta, self.runtime.modes.clone())
    }

    pub fn save_session(&self, path: &Path, format: SessionFormat) -> AppResult<()> {
        let snapshot = self.history_snapshot();
        let session = SessionData::from_snapshot(Some(self.session_meta()), &snapshot);
        match format {
            SessionFormat::Json => cav_session::save_json(path, &session)?,
            SessionFormat::Csv => cav_session::save_csv(path, &session)?,
        }
        info!(rows = session.len(), ?format, "session saved");
        Ok(())
    }

    /// Load a session and replace the history with it; the driver is stopped
    /// first. On any failure the in-memory history is left untouched.
    pub fn load_session(&self, path: &Path, format: SessionFormat) -> AppResult<usize> {
        let session = match format {
            SessionFormat::Json => cav_session::load_json(path)?,
            SessionFormat::Csv => cav_session::load_csv(path)?,
        };
        let store = session.to_store(self.runtime.history_capacity)?;
        let rows = store.len();

        self.shared.running.store(false, Ordering::Relaxed);
        *self.shared.history.lock().expect("history lock poisoned") = store;
        self.shared
            .playback
            .lock()
            .expect("playback lock poisoned")
            .seek(0, rows);
        info!(rows, "session loaded");
        Ok(rows)
    }

    // --- status ----------------------------------------------------------

    pub fn status(&self) -> ServiceStatus {
        let playback = self.shared.playback.lock().expect("playback lock poisoned");
        let scan = self.shared.scan.lock().expect("scan state lock poisoned");
        ServiceStatus {
            driver_state: if self.shared.running.load(Ordering::Relaxed) {
                DriverState::Running
            } else {
                DriverState::Stopped
            },
            sim_time: *self.shared.sim_time.lock().expect("sim time lock poisoned"),
            samples: self.shared.history.lock().expect("history lock poisoned").len(),
            recording: self.is_recording(),
            playback_active: playback.is_active(),
            playback_index: playback.index(),
            last_error: self
                .shared
                .last_error
                .lock()
                .expect("error lock poisoned")
                .clone(),
            scan_running: scan.running,
            scan_error: scan.error.clone(),
        }
    }
}

impl Drop for SimulatorService {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

/// The stepping loop: one dedicated worker owns the engine. Stop and reset
/// requests are observed at step boundaries; playback suspends stepping.
fn worker_loop(mut engine: SimEngine, shared: Arc<Shared>, pace: Duration) {
    loop {
        if shared.shutdown.load(Ordering::Relaxed) {
            break;
        }

        if shared.reset_requested.swap(false, Ordering::Relaxed) {
            engine.reset();
            shared
                .history
                .lock()
                .expect("history lock poisoned")
                .clear();
            *shared.sim_time.lock().expect("sim time lock poisoned") = 0.0;
            *shared.last_error.lock().expect("error lock poisoned") = None;
            shared.running.store(false, Ordering::Relaxed);
        }

        let playback_active = shared
            .playback
            .lock()
            .expect("playback lock poisoned")
            .is_active();
        let stepping = shared.running.load(Ordering::Relaxed) && !playback_active;

        if playback_active {
            let len = shared.history.lock().expect("history lock poisoned").len();
            shared
                .playback
                .lock()
                .expect("playback lock poisoned")
                .advance(len);
        } else if stepping {
            if !engine.is_running() {
                engine.start();
            }
            let ctrl = shared.params.lock().expect("params lock poisoned").clone();
            match engine.step(&ctrl) {
                Ok(out) => {
                    let recording = shared.recording.load(Ordering::Relaxed);
                    {
                        let mut history =
                            shared.history.lock().expect("history lock poisoned");
                        history.append(out.sample, &out.mode_values, recording.then_some(&ctrl));
                    }
                    *shared.sim_time.lock().expect("sim time lock poisoned") =
                        engine.sim_time();
                }
                Err(e) => {
                    // surface the failure instead of stepping on with stale
                    // state
                    shared.running.store(false, Ordering::Relaxed);
                    *shared.last_error.lock().expect("error lock poisoned") =
                        Some(e.to_string());
                }
            }
        } else if engine.is_running() {
            engine.stop();
        }

        if !stepping && !playback_active {
            thread::sleep(IDLE_PACE);
        } else if !pace.is_zero() {
            thread::sleep(pace);
        }
    }
}
